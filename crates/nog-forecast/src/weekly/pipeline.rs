//! Weekly retrain-and-predict pipeline

use super::forecast::{ForecastInput, ForecastMode, generate_forecasts};
use super::store::{PredictionRecord, PredictionStore};
use super::tracker::{TrackerStore, UpdateStatus};
use crate::config::ForecastConfig;
use crate::data::{DataPipeline, DataRequest, NewsRefreshOutcome, PriceRefreshOutcome};
use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use crate::model::{ModelMetrics, PerformanceRecord, TrainedModel, Trainer};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Whether the run refreshes the cached data before predicting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataRefresh {
    /// Refresh when the freshness tracker says the data is stale
    #[default]
    Auto,
    Force,
    Skip,
}

impl fmt::Display for DataRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Force => write!(f, "force"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for DataRefresh {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "force" => Ok(Self::Force),
            "skip" => Ok(Self::Skip),
            other => Err(ForecastError::ConfigError(format!("unknown refresh policy '{other}'"))),
        }
    }
}

/// Options of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub refresh: DataRefresh,
    pub retrain: bool,
    pub prediction_days: usize,
    pub mode: ForecastMode,
}

impl RunOptions {
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            refresh: DataRefresh::Auto,
            retrain: true,
            prediction_days: config.prediction_days,
            mode: ForecastMode::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// Recoverable failure: fetch, training or empty data
    Error,
    /// Persisted state is malformed and needs attention
    CorruptState,
}

/// Structured result of a run, consumed by the external scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<PredictionRecord>,
    /// Present when the model was trained during this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_metrics: Option<ModelMetrics>,
    #[serde(default)]
    pub data_points: usize,
    #[serde(default)]
    pub data_updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_refresh: Option<PriceRefreshOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_refresh: Option<NewsRefreshOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    fn failure(err: &ForecastError, timestamp: NaiveDateTime) -> Self {
        Self {
            status: if err.is_corruption() {
                RunStatus::CorruptState
            } else {
                RunStatus::Error
            },
            timestamp,
            predictions: Vec::new(),
            model_metrics: None,
            data_points: 0,
            data_updated: false,
            price_refresh: None,
            news_refresh: None,
            error: Some(err.to_string()),
        }
    }
}

pub struct WeeklyPredictionPipeline {
    config: Arc<ForecastConfig>,
    data: DataPipeline,
    trainer: Trainer,
    tracker: TrackerStore,
    store: PredictionStore,
}

impl WeeklyPredictionPipeline {
    pub fn new(config: Arc<ForecastConfig>, data: DataPipeline) -> Self {
        Self {
            trainer: Trainer::new(config.gbm.clone(), config.test_fraction),
            tracker: TrackerStore::new(config.tracker_path()),
            store: PredictionStore::new(config.predictions_path(), config.performance_path()),
            data,
            config,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run with a boolean refresh switch: `update_data` forces or skips
    /// the refresh
    pub async fn run_weekly_pipeline(
        &self,
        update_data: bool,
        retrain: bool,
        prediction_days: usize,
    ) -> RunReport {
        let refresh = if update_data {
            DataRefresh::Force
        } else {
            DataRefresh::Skip
        };
        self.run(RunOptions {
            refresh,
            retrain,
            prediction_days,
            mode: ForecastMode::Flat,
        })
        .await
    }

    pub async fn run(&self, options: RunOptions) -> RunReport {
        self.run_at(options, Local::now().naive_local()).await
    }

    /// Run the full pipeline with an explicit clock. Every error is caught
    /// here and turned into a failed report; the tracker is only written on
    /// success.
    #[instrument(skip(self), fields(ticker = %self.config.ticker))]
    pub async fn run_at(&self, options: RunOptions, now: NaiveDateTime) -> RunReport {
        info!("Starting weekly prediction pipeline...");

        match self.execute(options, now).await {
            Ok(report) => {
                info!("Weekly prediction pipeline completed successfully");
                report
            }
            Err(e) => {
                error!("Pipeline failed: {}", e);
                RunReport::failure(&e, now)
            }
        }
    }

    async fn execute(&self, options: RunOptions, now: NaiveDateTime) -> Result<RunReport> {
        if options.prediction_days == 0 {
            return Err(ForecastError::ConfigError(
                "prediction_days must be greater than 0".to_string(),
            ));
        }

        // 1. Fetch
        let refresh = match options.refresh {
            DataRefresh::Auto => self.tracker.should_update_at(now),
            DataRefresh::Force => true,
            DataRefresh::Skip => false,
        };
        let data = self
            .data
            .run(DataRequest {
                refresh,
                ..DataRequest::default()
            })
            .await?;

        if data.frame.is_empty() {
            return Err(ForecastError::EmptyData(
                "feature frame is empty after feature engineering".to_string(),
            ));
        }

        // 2. Prepare features
        let mut frame = data.frame;
        frame.fill_missing();

        // 3. Train or load
        let (model, performance) = self.train_or_load(&frame, options.retrain, now)?;

        // 4. Forecast
        let model_version = self.config.model_file.display().to_string();
        let predictions = generate_forecasts(
            &ForecastInput {
                model: &model,
                frame: &frame,
                prices: &data.prices,
                macro_records: &data.macro_records,
                model_version: &model_version,
            },
            options.prediction_days,
            options.mode,
            now,
        )?;

        // 5. Persist
        self.store.save_predictions(&predictions, now)?;
        let model_metrics = match performance {
            Some(record) => {
                let metrics = record.metrics;
                self.store.append_performance(record)?;
                Some(metrics)
            }
            None => None,
        };

        let update_success = !refresh || data.price_refresh.succeeded();
        self.tracker.record(update_success, now)?;

        // 6. Report
        Ok(RunReport {
            status: RunStatus::Success,
            timestamp: now,
            predictions,
            model_metrics,
            data_points: frame.len(),
            data_updated: refresh && data.price_refresh.succeeded(),
            price_refresh: Some(data.price_refresh),
            news_refresh: Some(data.news_refresh),
            error: None,
        })
    }

    /// Train when asked to, or when the saved model is missing, unreadable or
    /// was trained on different columns
    fn train_or_load(
        &self,
        frame: &FeatureFrame,
        retrain: bool,
        now: NaiveDateTime,
    ) -> Result<(TrainedModel, Option<PerformanceRecord>)> {
        let model_path = self.config.model_path();

        if !retrain {
            match TrainedModel::load(&model_path) {
                Ok(model) if model.matches_columns(frame.columns()) => return Ok((model, None)),
                Ok(_) => warn!("Saved model was trained on different features, training new model..."),
                Err(e) => warn!("No usable saved model ({}), training new model...", e),
            }
        }

        info!("Training weekly model...");
        let (model, record) = self.trainer.train_and_evaluate(frame, now)?;
        model.save(&model_path)?;
        Ok((model, Some(record)))
    }

    /// Whether the freshness tracker asks for a data refresh now
    pub fn should_update_data(&self) -> bool {
        self.tracker.should_update()
    }

    pub fn get_latest_predictions(&self) -> Result<Option<Vec<PredictionRecord>>> {
        self.store.latest_predictions()
    }

    pub fn get_performance_history(&self) -> Vec<PerformanceRecord> {
        self.store.performance_history()
    }

    pub fn get_data_update_status(&self) -> UpdateStatus {
        self.tracker.status()
    }
}
