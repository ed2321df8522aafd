//! Gradient-boosted regression model and its trainer

pub mod gbm;
pub mod trainer;

pub use gbm::{GbmParams, GradientBoostedRegressor};
pub use trainer::{
    ModelMetrics, PerformanceRecord, TrainedModel, Trainer, compute_metrics, evaluate, test_size,
    train,
};
