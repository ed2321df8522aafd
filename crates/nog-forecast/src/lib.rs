//! Weekly price forecasting for a single equity
//!
//! This crate fetches daily price history and macroeconomic series, derives
//! technical and macro features, trains a gradient-boosted regressor and
//! produces short-horizon forecasts. It includes:
//!
//! - Price and macro clients (Yahoo Finance, FRED) behind source traits
//! - A CSV price cache with incremental appends
//! - Feature engineering (moving averages, Bollinger bands, RSI, VWAP, ...)
//! - A deterministic gradient boosting regressor with JSON persistence
//! - The weekly pipeline with a data-freshness tracker and prediction history
//!
//! # Example
//!
//! ```rust,ignore
//! use nog_forecast::{
//!     CachedMacroSource, DataPipeline, ForecastConfig, FredClient, WeeklyPredictionPipeline,
//!     YahooFinanceClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(ForecastConfig::default().with_env_api_key());
//!     let fred = FredClient::from_env()?;
//!     let macros = CachedMacroSource::new(Arc::new(fred), config.macro_cache_ttl);
//!     let data = DataPipeline::new(
//!         config.clone(),
//!         Arc::new(YahooFinanceClient::new()),
//!         Arc::new(macros),
//!     );
//!
//!     let pipeline = WeeklyPredictionPipeline::new(config, data);
//!     let report = pipeline.run_weekly_pipeline(true, true, 5).await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod weekly;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::{FredClient, MacroSource, PriceSource, YahooFinanceClient};
pub use cache::CachedMacroSource;
pub use config::ForecastConfig;
pub use data::{DataPipeline, DataRequest, NewsRefresher, PriceCache, PriceRecord};
pub use error::{ForecastError, Result};
pub use features::{FeatureFrame, build_feature_frame};
pub use model::{GbmParams, ModelMetrics, PerformanceRecord, TrainedModel, Trainer};
pub use weekly::{
    DataRefresh, ForecastMode, PredictionRecord, RunOptions, RunReport, RunStatus,
    UpdateStatus, WeeklyPredictionPipeline,
};
