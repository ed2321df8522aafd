//! Error types for forecasting operations

use std::path::PathBuf;
use thiserror::Error;

/// Forecasting specific errors
#[derive(Debug, Error)]
pub enum ForecastError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No usable rows after fetching or feature engineering
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Model fitting or prediction failed
    #[error("Model error: {0}")]
    ModelError(String),

    /// A persisted file exists but cannot be trusted
    #[error("Corrupt state in {}: {reason}", path.display())]
    CorruptState {
        path: PathBuf,
        reason: String,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ForecastError {
    /// Build a [`ForecastError::CorruptState`] for `path`
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from malformed persisted state rather than a
    /// transient failure
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }
}

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForecastError::EmptyData("no macro observations".to_string());
        assert_eq!(err.to_string(), "Empty data: no macro observations");

        let err = ForecastError::corrupt("data/NOG_prices.csv", "missing Date column");
        assert_eq!(
            err.to_string(),
            "Corrupt state in data/NOG_prices.csv: missing Date column"
        );
    }

    #[test]
    fn test_corruption_classification() {
        assert!(ForecastError::corrupt("x.json", "bad").is_corruption());
        assert!(!ForecastError::ApiError("timeout".to_string()).is_corruption());
        assert!(!ForecastError::EmptyData("none".to_string()).is_corruption());
    }
}
