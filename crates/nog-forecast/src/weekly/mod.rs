//! Weekly retraining-and-prediction pipeline with update scheduling

pub mod forecast;
pub mod pipeline;
pub mod store;
pub mod tracker;

pub use forecast::{ForecastMode, confidence_interval, generate_forecasts, next_business_days};
pub use pipeline::{DataRefresh, RunOptions, RunReport, RunStatus, WeeklyPredictionPipeline};
pub use store::{ConfidenceInterval, PERFORMANCE_HISTORY_LIMIT, PredictionRecord, PredictionStore};
pub use tracker::{DataUpdateTracker, FreshnessState, TrackerStore, UpdateStatus};
