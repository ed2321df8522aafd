//! Multi-day forecasting from the latest feature row

use super::store::{ConfidenceInterval, PredictionRecord};
use crate::data::{MacroRecord, PriceRecord};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureFrame, build_feature_frame};
use crate::model::TrainedModel;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Relative half-width of the placeholder interval
pub const INTERVAL_MARGIN: f64 = 0.02;
pub const INTERVAL_LEVEL: f64 = 0.95;

/// How later horizon days are predicted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    /// Every day is predicted from the same latest feature row
    #[default]
    Flat,
    /// Each prediction is appended as a synthetic bar and the features are
    /// recomputed before the next day
    Rolling,
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Rolling => write!(f, "rolling"),
        }
    }
}

impl FromStr for ForecastMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "rolling" => Ok(Self::Rolling),
            other => Err(ForecastError::ConfigError(format!("unknown forecast mode '{other}'"))),
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next `count` business days after `today`, strictly increasing
pub fn next_business_days(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = today;
    while dates.len() < count {
        current += Duration::days(1);
        if !is_weekend(current) {
            dates.push(current);
        }
    }
    dates
}

/// Placeholder ±2% band around a prediction
pub fn confidence_interval(prediction: f64) -> ConfidenceInterval {
    let margin = prediction * INTERVAL_MARGIN;
    ConfidenceInterval {
        lower: prediction - margin,
        upper: prediction + margin,
        confidence_level: INTERVAL_LEVEL,
    }
}

/// Inputs shared by both forecast modes
pub struct ForecastInput<'a> {
    pub model: &'a TrainedModel,
    pub frame: &'a FeatureFrame,
    pub prices: &'a [PriceRecord],
    pub macro_records: &'a [MacroRecord],
    pub model_version: &'a str,
}

/// Produce one prediction per business day after `now`
pub fn generate_forecasts(
    input: &ForecastInput<'_>,
    days: usize,
    mode: ForecastMode,
    now: NaiveDateTime,
) -> Result<Vec<PredictionRecord>> {
    let latest = input
        .frame
        .last()
        .ok_or_else(|| ForecastError::EmptyData("no feature rows to forecast from".to_string()))?;

    if !input.model.matches_columns(input.frame.columns()) {
        return Err(ForecastError::ModelError(
            "model feature columns do not match the feature frame".to_string(),
        ));
    }

    info!("Generating {} forecast for next {} days", mode, days);
    let dates = next_business_days(now.date(), days);

    let prices = match mode {
        ForecastMode::Flat => {
            let price = input.model.predict(&latest.values);
            vec![price; dates.len()]
        }
        ForecastMode::Rolling => rolling_prices(input, &dates)?,
    };

    Ok(dates
        .into_iter()
        .zip(prices)
        .map(|(date, price)| PredictionRecord {
            date,
            predicted_price: price,
            prediction_date: now,
            model_version: input.model_version.to_string(),
            confidence_interval: confidence_interval(price),
        })
        .collect())
}

/// Predict day by day, feeding each prediction back as a synthetic bar.
///
/// When the rebuilt frame has no row for the synthetic bar (an indicator is
/// undefined there), the previous row is reused for the next day.
fn rolling_prices(input: &ForecastInput<'_>, dates: &[NaiveDate]) -> Result<Vec<f64>> {
    let mut history = input.prices.to_vec();
    let mut row = input
        .frame
        .last()
        .ok_or_else(|| ForecastError::EmptyData("no feature rows to forecast from".to_string()))?
        .clone();
    let mut out = Vec::with_capacity(dates.len());

    for &date in dates {
        let price = input.model.predict(&row.values);
        out.push(price);

        let volume = history.last().map_or(0.0, |p| p.volume);
        history.push(PriceRecord {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        });

        let mut frame = build_feature_frame(&history, input.macro_records)?;
        frame.fill_missing();
        match frame.last() {
            Some(next) if next.date == date => row = next.clone(),
            _ => warn!(
                "No feature row for synthetic bar {}, reusing features from {}",
                date, row.date
            ),
        }
        debug!("Rolling forecast {} -> {:.4}", date, price);
    }

    Ok(out)
}
