//! Configuration management utilities

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, etc.)
    pub environment: String,
    /// Root directory holding caches, models and generated files
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "nog".to_string(),
            environment: "development".to_string(),
            data_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Recognised variables: `NOG_ENV`, `NOG_DATA_DIR`.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to load .env file: {}", e);
            }
        }

        let defaults = Self::default();
        Self {
            app_name: defaults.app_name,
            environment: std::env::var("NOG_ENV").unwrap_or(defaults.environment),
            data_dir: std::env::var("NOG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// Override the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Resolve a path relative to the data directory
    pub fn data_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
