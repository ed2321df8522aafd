//! Configuration for the forecasting pipeline

use crate::error::{ForecastError, Result};
use crate::model::GbmParams;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ticker the toolkit is built around
pub const DEFAULT_TICKER: &str = "NOG";

/// Configuration for the data and weekly prediction pipelines
///
/// File locations are stored relative to `data_dir` and resolved with the
/// `*_path` accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Ticker symbol to forecast
    pub ticker: String,

    /// Root directory every relative path is resolved against
    pub data_dir: PathBuf,

    /// Cached daily price history (CSV)
    pub price_cache_file: PathBuf,

    /// Serialized model artifact (JSON)
    pub model_file: PathBuf,

    /// Latest predictions (JSON, overwritten each run)
    pub predictions_file: PathBuf,

    /// Bounded performance history (JSON array)
    pub performance_file: PathBuf,

    /// Data update tracker (JSON, single record)
    pub tracker_file: PathBuf,

    /// First date fetched when no price cache exists yet
    pub history_start: NaiveDate,

    /// Days of macro history fetched before the first price date
    pub macro_lookback_days: i64,

    /// Gradient boosting hyperparameters
    pub gbm: GbmParams,

    /// Fraction of rows held out (from the end) for evaluation
    pub test_fraction: f64,

    /// Business days to forecast
    pub prediction_days: usize,

    /// Cache TTL for macro series
    pub macro_cache_ttl: Duration,

    /// Request timeout for HTTP clients
    pub request_timeout: Duration,

    /// FRED API key (optional until macro data is fetched)
    pub fred_api_key: Option<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_TICKER.to_string(),
            data_dir: PathBuf::from("."),
            price_cache_file: PathBuf::from("data/NOG_prices.csv"),
            model_file: PathBuf::from("saved_models/gbm_model.json"),
            predictions_file: PathBuf::from("data/weekly_predictions.json"),
            performance_file: PathBuf::from("data/model_performance.json"),
            tracker_file: PathBuf::from("data/data_update_tracker.json"),
            history_start: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default(),
            macro_lookback_days: 45,
            gbm: GbmParams::default(),
            test_fraction: 0.2,
            prediction_days: 5,
            macro_cache_ttl: Duration::from_secs(3600), // 1 hour
            request_timeout: Duration::from_secs(30),
            fred_api_key: None,
        }
    }
}

impl ForecastConfig {
    /// Create a new configuration builder
    pub fn builder() -> ForecastConfigBuilder {
        ForecastConfigBuilder::default()
    }

    /// Load the FRED API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var("FRED_API_KEY") {
            self.fred_api_key = Some(key);
        }
        self
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.data_dir.join(relative)
    }

    pub fn price_cache_path(&self) -> PathBuf {
        self.resolve(&self.price_cache_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model_file)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.resolve(&self.predictions_file)
    }

    pub fn performance_path(&self) -> PathBuf {
        self.resolve(&self.performance_file)
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.resolve(&self.tracker_file)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(ForecastError::ConfigError("ticker must not be empty".to_string()));
        }

        if self.prediction_days == 0 {
            return Err(ForecastError::ConfigError(
                "prediction_days must be greater than 0".to_string(),
            ));
        }

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::ConfigError(
                "test_fraction must be between 0 and 1".to_string(),
            ));
        }

        if self.macro_lookback_days < 0 {
            return Err(ForecastError::ConfigError(
                "macro_lookback_days must not be negative".to_string(),
            ));
        }

        self.gbm.validate()
    }
}

/// Builder for ForecastConfig
#[derive(Debug, Default)]
pub struct ForecastConfigBuilder {
    ticker: Option<String>,
    data_dir: Option<PathBuf>,
    history_start: Option<NaiveDate>,
    macro_lookback_days: Option<i64>,
    gbm: Option<GbmParams>,
    test_fraction: Option<f64>,
    prediction_days: Option<usize>,
    macro_cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    fred_api_key: Option<String>,
}

impl ForecastConfigBuilder {
    /// Set the ticker symbol
    pub fn ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the first date fetched for an empty cache
    pub fn history_start(mut self, date: NaiveDate) -> Self {
        self.history_start = Some(date);
        self
    }

    /// Set how far before the first price date macro data is fetched
    pub fn macro_lookback_days(mut self, days: i64) -> Self {
        self.macro_lookback_days = Some(days);
        self
    }

    /// Set the model hyperparameters
    pub fn gbm(mut self, params: GbmParams) -> Self {
        self.gbm = Some(params);
        self
    }

    /// Set the evaluation hold-out fraction
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = Some(fraction);
        self
    }

    /// Set the forecast horizon
    pub fn prediction_days(mut self, days: usize) -> Self {
        self.prediction_days = Some(days);
        self
    }

    /// Set cache TTL for macro series
    pub fn macro_cache_ttl(mut self, duration: Duration) -> Self {
        self.macro_cache_ttl = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set FRED API key
    pub fn fred_api_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    /// Load FRED API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var("FRED_API_KEY") {
            self.fred_api_key = Some(key);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ForecastConfig> {
        let defaults = ForecastConfig::default();

        let config = ForecastConfig {
            ticker: self.ticker.unwrap_or(defaults.ticker),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            history_start: self.history_start.unwrap_or(defaults.history_start),
            macro_lookback_days: self.macro_lookback_days.unwrap_or(defaults.macro_lookback_days),
            gbm: self.gbm.unwrap_or(defaults.gbm),
            test_fraction: self.test_fraction.unwrap_or(defaults.test_fraction),
            prediction_days: self.prediction_days.unwrap_or(defaults.prediction_days),
            macro_cache_ttl: self.macro_cache_ttl.unwrap_or(defaults.macro_cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            fred_api_key: self.fred_api_key,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ForecastConfig::default();
        assert_eq!(config.ticker, "NOG");
        assert_eq!(config.prediction_days, 5);
        assert_eq!(config.macro_lookback_days, 45);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ForecastConfig::builder()
            .data_dir("/tmp/nog")
            .prediction_days(3)
            .request_timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.prediction_days, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(
            config.model_path(),
            PathBuf::from("/tmp/nog/saved_models/gbm_model.json")
        );
        assert_eq!(
            config.tracker_path(),
            PathBuf::from("/tmp/nog/data/data_update_tracker.json")
        );
    }

    #[test]
    fn test_validation_rejects_zero_horizon() {
        let result = ForecastConfig::builder().prediction_days(0).build();
        assert!(matches!(result, Err(ForecastError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_bad_test_fraction() {
        let config = ForecastConfig {
            test_fraction: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_checks_model_params() {
        let config = ForecastConfig {
            gbm: GbmParams {
                n_trees: 0,
                ..GbmParams::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
