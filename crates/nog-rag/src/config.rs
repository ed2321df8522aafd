//! Configuration for ingestion, corpus building and question answering

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub ticker: String,

    /// Root directory every relative path is resolved against
    pub data_dir: PathBuf,

    pub news_file: PathBuf,
    pub financials_file: PathBuf,
    pub earnings_file: PathBuf,
    pub sec_chunks_file: PathBuf,
    pub corpus_file: PathBuf,
    pub index_file: PathBuf,

    /// Articles requested per NewsAPI query
    pub news_page_size: u32,

    /// How far back SEC filings are collected
    pub sec_years: u32,

    /// Target length of a filing chunk, in characters
    pub chunk_size: usize,

    /// Documents retrieved per question
    pub top_k: usize,

    pub answer_model: String,
    pub max_tokens: usize,
    pub temperature: f32,

    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ticker: "NOG".to_string(),
            data_dir: PathBuf::from("."),
            news_file: PathBuf::from("data/NOG_news.csv"),
            financials_file: PathBuf::from("data/NOG_financials.csv"),
            earnings_file: PathBuf::from("data/NOG_earnings.csv"),
            sec_chunks_file: PathBuf::from("data/chunks/sec_chunks.jsonl"),
            corpus_file: PathBuf::from("data/chunks/comprehensive_corpus.jsonl"),
            index_file: PathBuf::from("data/vector_index.json"),
            news_page_size: 50,
            sec_years: 2,
            chunk_size: 1000,
            top_k: 5,
            answer_model: "gpt-4o".to_string(),
            max_tokens: 256,
            temperature: 0.2,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RagConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.data_dir.join(relative)
    }

    pub fn news_path(&self) -> PathBuf {
        self.resolve(&self.news_file)
    }

    pub fn financials_path(&self) -> PathBuf {
        self.resolve(&self.financials_file)
    }

    pub fn earnings_path(&self) -> PathBuf {
        self.resolve(&self.earnings_file)
    }

    pub fn sec_chunks_path(&self) -> PathBuf {
        self.resolve(&self.sec_chunks_file)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.corpus_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index_file)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(RagError::ConfigError("ticker must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than 0".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than 0".to_string()));
        }
        if self.news_page_size == 0 || self.news_page_size > 100 {
            return Err(RagError::ConfigError(
                "news_page_size must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.answer_model, "gpt-4o");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_resolve_against_data_dir() {
        let config = RagConfig::default().with_data_dir("/srv/nog");
        assert_eq!(
            config.corpus_path(),
            PathBuf::from("/srv/nog/data/chunks/comprehensive_corpus.jsonl")
        );
    }

    #[test]
    fn test_validation() {
        let config = RagConfig {
            top_k: 0,
            ..RagConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RagConfig {
            news_page_size: 500,
            ..RagConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
