//! Error types for ingestion, corpus and retrieval operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur while ingesting documents or answering questions
#[derive(Error, Debug)]
pub enum RagError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("NewsAPI error: {0}")]
    NewsApiError(String),

    #[error("SEC EDGAR error: {0}")]
    SecError(String),

    #[error("Alpha Vantage error: {0}")]
    AlphaVantageError(String),

    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    LlmError(#[from] nog_llm::LLMError),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A persisted corpus or index file could not be interpreted
    #[error("Corrupt file {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    #[error("{0}")]
    Other(String),
}

impl RagError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::RateLimitExceeded {
            provider: "NewsAPI".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded for NewsAPI");

        let err = RagError::corrupt("data/index.json", "line 3: expected value");
        assert!(err.to_string().contains("data/index.json"));
    }

    #[test]
    fn test_from_llm_error() {
        let err: RagError = nog_llm::LLMError::AuthenticationFailed.into();
        assert!(matches!(err, RagError::LlmError(_)));
    }
}
