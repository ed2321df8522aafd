//! Gradient-boosted regression trees
//!
//! Squared-error boosting with L2-regularised leaf weights, row subsampling
//! without replacement and per-tree column sampling. Leaf values already
//! include the learning rate, so a prediction is the base score plus the sum
//! of the leaves reached in every tree.

use crate::error::{ForecastError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Number of boosting rounds
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to every leaf
    pub learning_rate: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Fraction of columns sampled for each tree
    pub colsample: f64,
    /// L2 regularisation on leaf weights
    pub lambda: f64,
    /// Seed for row/column sampling
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample: 0.8,
            lambda: 1.0,
            seed: 42,
        }
    }
}

impl GbmParams {
    pub fn validate(&self) -> Result<()> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;

        if self.n_trees == 0 {
            return Err(ForecastError::ConfigError("n_trees must be greater than 0".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::ConfigError("max_depth must be greater than 0".to_string()));
        }
        if !fraction(self.learning_rate) {
            return Err(ForecastError::ConfigError("learning_rate must be in (0, 1]".to_string()));
        }
        if !fraction(self.subsample) || !fraction(self.colsample) {
            return Err(ForecastError::ConfigError(
                "subsample and colsample must be in (0, 1]".to_string(),
            ));
        }
        if self.lambda.is_nan() || self.lambda < 0.0 {
            return Err(ForecastError::ConfigError("lambda must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as a flat node list, root first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        // Bounded walk: a well-formed tree reaches a leaf in at most nodes.len() steps
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
        0.0
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows one tree on the current residuals
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    residuals: &'a [f64],
    columns: &'a [usize],
    params: &'a GbmParams,
    nodes: Vec<Node>,
    importance: &'a mut [f64],
}

impl TreeBuilder<'_> {
    fn leaf_value(&self, sum: f64, count: usize) -> f64 {
        self.params.learning_rate * sum / (count as f64 + self.params.lambda)
    }

    fn score(&self, sum: f64, count: usize) -> f64 {
        sum * sum / (count as f64 + self.params.lambda)
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let sum: f64 = rows.iter().map(|&i| self.residuals[i]).sum();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(sum, rows.len()),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }

        let Some(split) = self.best_split(&rows, sum) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        self.importance[split.feature] += split.gain;
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], total: f64) -> Option<SplitCandidate> {
        let n = rows.len();
        let parent = self.score(total, n);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.columns {
            let mut pairs: Vec<(f64, f64)> = rows
                .iter()
                .map(|&i| (self.x[i][feature], self.residuals[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += pairs[k].1;
                let (here, next) = (pairs[k].0, pairs[k + 1].0);
                if here == next {
                    continue;
                }

                let left_n = k + 1;
                let gain = self.score(left_sum, left_n) + self.score(total - left_sum, n - left_n)
                    - parent;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    let mid = here + (next - here) / 2.0;
                    let threshold = if mid < next { mid } else { here };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best.filter(|b| b.gain > 1e-12)
    }
}

/// Boosted ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    params: GbmParams,
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
    /// Total split gain per feature, normalised to sum to 1
    feature_importance: Vec<f64>,
}

impl GradientBoostedRegressor {
    /// Fit the ensemble on a row-major feature matrix
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &GbmParams) -> Result<Self> {
        params.validate()?;

        if x.is_empty() {
            return Err(ForecastError::ModelError("training set is empty".to_string()));
        }
        if x.len() != y.len() {
            return Err(ForecastError::ModelError(format!(
                "feature rows ({}) and targets ({}) differ in length",
                x.len(),
                y.len()
            )));
        }

        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(ForecastError::ModelError(
                "feature rows must share a non-zero width".to_string(),
            ));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelError("training data contains non-finite values".to_string()));
        }

        let n = x.len();
        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut importance = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let row_count = ((n as f64 * params.subsample).round() as usize).clamp(1, n);
        let col_count = ((n_features as f64 * params.colsample).round() as usize).clamp(1, n_features);

        for _ in 0..params.n_trees {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();

            let rows = sample(&mut rng, n, row_count).into_vec();
            let mut columns = sample(&mut rng, n_features, col_count).into_vec();
            columns.sort_unstable();

            let mut builder = TreeBuilder {
                x,
                residuals: &residuals,
                columns: &columns,
                params,
                nodes: Vec::new(),
                importance: &mut importance,
            };
            builder.build(rows, 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };

            for (pred, row) in predictions.iter_mut().zip(x) {
                *pred += tree.predict(row);
            }
            trees.push(tree);
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }

        Ok(Self {
            params: params.clone(),
            base_score,
            n_features,
            trees,
            feature_importance: importance,
        })
    }

    /// Predict a single row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Predict every row of a matrix
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importance(&self) -> &[f64] {
        &self.feature_importance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> GbmParams {
        GbmParams {
            n_trees: 60,
            max_depth: 3,
            learning_rate: 0.2,
            ..GbmParams::default()
        }
    }

    /// y depends on the first column only; the second is noise
    fn dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..120)
            .map(|i| vec![f64::from(i) / 10.0, f64::from((i * 37) % 11)])
            .collect();
        let y = x.iter().map(|r| 3.0 * r[0] + 1.0).collect();
        (x, y)
    }

    fn mse(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_fit_beats_mean_predictor() {
        let (x, y) = dataset();
        let model = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline = mse(&y, &vec![mean; y.len()]);
        let fitted = mse(&y, &model.predict_batch(&x));

        assert_eq!(model.n_trees(), 60);
        assert!(fitted < baseline * 0.05, "fitted {fitted} vs baseline {baseline}");
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let (x, y) = dataset();
        let a = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        let b = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_importance_normalised_and_informative() {
        let (x, y) = dataset();
        let model = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        let importance = model.feature_importance();

        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importance[0] > importance[1]);
    }

    #[test]
    fn test_constant_target_predicts_constant() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let y = vec![7.5; 20];
        let model = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();

        assert!((model.predict(&[3.0]) - 7.5).abs() < 1e-12);
        assert!(model.feature_importance().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_invalid_inputs() {
        let params = small_params();
        assert!(GradientBoostedRegressor::fit(&[], &[], &params).is_err());
        assert!(GradientBoostedRegressor::fit(&[vec![1.0]], &[1.0, 2.0], &params).is_err());
        assert!(GradientBoostedRegressor::fit(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0], &params).is_err());
        assert!(GradientBoostedRegressor::fit(&[vec![f64::NAN]], &[1.0], &params).is_err());
    }

    #[test]
    fn test_params_validation() {
        assert!(GbmParams::default().validate().is_ok());
        assert!(GbmParams { subsample: 0.0, ..GbmParams::default() }.validate().is_err());
        assert!(GbmParams { learning_rate: 1.5, ..GbmParams::default() }.validate().is_err());
        assert!(GbmParams { max_depth: 0, ..GbmParams::default() }.validate().is_err());
    }

    #[test]
    fn test_serialized_model_predicts_identically() {
        let (x, y) = dataset();
        let model = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostedRegressor = serde_json::from_str(&json).unwrap();
        assert!((restored.predict(&x[17]) - model.predict(&x[17])).abs() < 1e-9);
    }
}
