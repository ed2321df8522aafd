//! Training, evaluation and the persisted model artifact

use super::gbm::{GbmParams, GradientBoostedRegressor};
use crate::data::prices::ensure_parent_dir;
use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

/// Regression metrics on the held-out tail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
}

/// Compute MSE, MAE and R² of predictions against actual values
///
/// For a constant target R² is 1 when every prediction is exact, else 0.
pub fn compute_metrics(actual: &[f64], predicted: &[f64]) -> ModelMetrics {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return ModelMetrics {
            mse: 0.0,
            mae: 0.0,
            r2: 0.0,
        };
    }
    let count = n as f64;

    let mean = actual[..n].iter().sum::<f64>() / count;
    let (ss_res, abs_err) = actual[..n]
        .iter()
        .zip(&predicted[..n])
        .fold((0.0, 0.0), |(ss, ae), (a, p)| (ss + (a - p).powi(2), ae + (a - p).abs()));
    let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean).powi(2)).sum();

    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };

    ModelMetrics {
        mse: ss_res / count,
        mae: abs_err / count,
        r2,
    }
}

/// Fit a regressor on a feature matrix
pub fn train(features: &[Vec<f64>], target: &[f64], params: &GbmParams) -> Result<GradientBoostedRegressor> {
    GradientBoostedRegressor::fit(features, target, params)
}

/// Score a regressor on held-out rows
pub fn evaluate(
    model: &GradientBoostedRegressor,
    features: &[Vec<f64>],
    target: &[f64],
) -> Result<ModelMetrics> {
    if features.is_empty() || features.len() != target.len() {
        return Err(ForecastError::ModelError(format!(
            "cannot evaluate on {} rows with {} targets",
            features.len(),
            target.len()
        )));
    }
    Ok(compute_metrics(target, &model.predict_batch(features)))
}

/// Rows held out for evaluation: `ceil(fraction * n)`, leaving at least one
/// training row
pub fn test_size(n: usize, fraction: f64) -> usize {
    if n < 2 {
        return 0;
    }
    ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1)
}

/// Serialized model plus the feature columns it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub regressor: GradientBoostedRegressor,
    pub feature_columns: Vec<String>,
    pub trained_at: NaiveDateTime,
}

impl TrainedModel {
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.regressor.predict(row)
    }

    /// Whether the model can score rows laid out with `columns`
    pub fn matches_columns(&self, columns: &[String]) -> bool {
        self.feature_columns == columns
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, serde_json::to_string(self)?)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&text)
            .map_err(|e| ForecastError::corrupt(path, e.to_string()))?;
        info!("Model loaded from {}", path.display());
        Ok(model)
    }
}

/// One training run's evaluation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub training_date: NaiveDateTime,
    pub metrics: ModelMetrics,
    pub feature_importance: BTreeMap<String, f64>,
    /// (rows, feature columns)
    pub data_shape: (usize, usize),
    pub train_size: usize,
    pub test_size: usize,
}

/// Chronological train/evaluate over a feature frame
#[derive(Debug, Clone)]
pub struct Trainer {
    params: GbmParams,
    test_fraction: f64,
}

impl Trainer {
    pub fn new(params: GbmParams, test_fraction: f64) -> Self {
        Self {
            params,
            test_fraction,
        }
    }

    /// Fit on the head of the frame and evaluate on the tail
    #[instrument(skip(self, frame), fields(rows = frame.len()))]
    pub fn train_and_evaluate(
        &self,
        frame: &FeatureFrame,
        now: NaiveDateTime,
    ) -> Result<(TrainedModel, PerformanceRecord)> {
        let n = frame.len();
        if n < 2 {
            return Err(ForecastError::EmptyData(format!(
                "need at least 2 feature rows to train, got {n}"
            )));
        }

        let x = frame.matrix();
        let y = frame.targets();
        let test = test_size(n, self.test_fraction);
        let split = n - test;

        let regressor = train(&x[..split], &y[..split], &self.params)?;
        let metrics = evaluate(&regressor, &x[split..], &y[split..])?;

        let feature_importance = frame
            .columns()
            .iter()
            .cloned()
            .zip(regressor.feature_importance().iter().copied())
            .collect();

        info!("Model training completed. R²: {:.4}", metrics.r2);

        let record = PerformanceRecord {
            training_date: now,
            metrics,
            feature_importance,
            data_shape: (n, frame.columns().len()),
            train_size: split,
            test_size: test,
        };
        let model = TrainedModel {
            regressor,
            feature_columns: frame.columns().to_vec(),
            trained_at: now,
        };

        Ok((model, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::build_feature_frame;
    use crate::testing::{fast_params, now, synthetic_macro, synthetic_prices};
    use tempfile::TempDir;

    #[test]
    fn test_compute_metrics() {
        let m = compute_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]);
        assert!((m.mse - 4.0 / 3.0).abs() < 1e-12);
        assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.r2 - (1.0 - 4.0 / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_r2_for_constant_target() {
        assert_eq!(compute_metrics(&[2.0, 2.0], &[2.0, 2.0]).r2, 1.0);
        assert_eq!(compute_metrics(&[2.0, 2.0], &[2.0, 3.0]).r2, 0.0);
    }

    #[test]
    fn test_metrics_serialize_with_upper_case_keys() {
        let json = serde_json::to_value(ModelMetrics {
            mse: 1.0,
            mae: 0.5,
            r2: 0.9,
        })
        .unwrap();
        assert_eq!(json["MSE"], 1.0);
        assert_eq!(json["R2"], 0.9);
    }

    #[test]
    fn test_test_size_is_ceiling() {
        assert_eq!(test_size(100, 0.2), 20);
        assert_eq!(test_size(101, 0.2), 21);
        assert_eq!(test_size(2, 0.2), 1);
        assert_eq!(test_size(1, 0.2), 0);
    }

    #[test]
    fn test_evaluate_rejects_empty() {
        let model = train(&[vec![1.0], vec![2.0]], &[1.0, 2.0], &fast_params()).unwrap();
        assert!(evaluate(&model, &[], &[]).is_err());
    }

    #[test]
    fn test_train_and_evaluate_splits_chronologically() {
        let prices = synthetic_prices(200);
        let frame = build_feature_frame(&prices, &synthetic_macro(&prices)).unwrap();
        let trainer = Trainer::new(fast_params(), 0.2);

        let (model, record) = trainer.train_and_evaluate(&frame, now()).unwrap();

        assert_eq!(record.train_size + record.test_size, frame.len());
        assert_eq!(record.test_size, test_size(frame.len(), 0.2));
        assert_eq!(record.data_shape, (frame.len(), 17));
        assert!(record.metrics.r2.is_finite() && record.metrics.r2 <= 1.0);
        assert_eq!(record.feature_importance.len(), 17);
        assert!(model.matches_columns(frame.columns()));
    }

    #[test]
    fn test_model_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved_models/gbm_model.json");
        let prices = synthetic_prices(120);
        let frame = build_feature_frame(&prices, &synthetic_macro(&prices)).unwrap();
        let (model, _) = Trainer::new(fast_params(), 0.2).train_and_evaluate(&frame, now()).unwrap();

        model.save(&path).unwrap();
        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.feature_columns, model.feature_columns);
        assert_eq!(loaded.regressor.n_trees(), model.regressor.n_trees());
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(TrainedModel::load(&path).unwrap_err().is_corruption());
    }
}
