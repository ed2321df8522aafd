//! Persisted predictions and the bounded performance history

use crate::data::prices::ensure_parent_dir;
use crate::error::{ForecastError, Result};
use crate::model::PerformanceRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Maximum number of performance records kept
pub const PERFORMANCE_HISTORY_LIMIT: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

/// Forecast for one business day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Target date
    pub date: NaiveDate,
    pub predicted_price: f64,
    /// When the forecast was generated
    pub prediction_date: NaiveDateTime,
    /// Reference to the model artifact that produced it
    pub model_version: String,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PredictionsFile {
    generated_date: NaiveDateTime,
    predictions: Vec<PredictionRecord>,
}

/// Reads and writes the predictions file and the performance history
#[derive(Debug, Clone)]
pub struct PredictionStore {
    predictions_path: PathBuf,
    performance_path: PathBuf,
}

impl PredictionStore {
    pub fn new(predictions_path: impl Into<PathBuf>, performance_path: impl Into<PathBuf>) -> Self {
        Self {
            predictions_path: predictions_path.into(),
            performance_path: performance_path.into(),
        }
    }

    pub fn predictions_path(&self) -> &Path {
        &self.predictions_path
    }

    /// Overwrite the predictions file
    pub fn save_predictions(&self, predictions: &[PredictionRecord], now: NaiveDateTime) -> Result<()> {
        let file = PredictionsFile {
            generated_date: now,
            predictions: predictions.to_vec(),
        };
        ensure_parent_dir(&self.predictions_path)?;
        std::fs::write(&self.predictions_path, serde_json::to_string_pretty(&file)?)?;
        info!("Predictions saved to {}", self.predictions_path.display());
        Ok(())
    }

    /// Latest saved predictions, `None` when nothing was saved yet
    ///
    /// An unparsable file is reported as corrupt state.
    pub fn latest_predictions(&self) -> Result<Option<Vec<PredictionRecord>>> {
        let text = match std::fs::read_to_string(&self.predictions_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No predictions file found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file: PredictionsFile = serde_json::from_str(&text)
            .map_err(|e| ForecastError::corrupt(&self.predictions_path, e.to_string()))?;
        Ok(Some(file.predictions))
    }

    /// Performance history, oldest first. Missing or corrupt files read as empty.
    pub fn performance_history(&self) -> Vec<PerformanceRecord> {
        let text = match std::fs::read_to_string(&self.performance_path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read {}: {}", self.performance_path.display(), e);
                }
                return Vec::new();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(
                "Performance history {} is corrupt ({}), starting fresh",
                self.performance_path.display(),
                e
            );
            Vec::new()
        })
    }

    /// Append a record, evicting the oldest beyond [`PERFORMANCE_HISTORY_LIMIT`]
    pub fn append_performance(&self, record: PerformanceRecord) -> Result<()> {
        let mut history = self.performance_history();
        history.push(record);
        if history.len() > PERFORMANCE_HISTORY_LIMIT {
            let excess = history.len() - PERFORMANCE_HISTORY_LIMIT;
            history.drain(..excess);
        }

        ensure_parent_dir(&self.performance_path)?;
        std::fs::write(&self.performance_path, serde_json::to_string_pretty(&history)?)?;
        info!("Performance data saved to {}", self.performance_path.display());
        Ok(())
    }
}
