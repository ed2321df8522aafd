//! Merged technical + macro feature frame

use super::indicators;
use crate::data::{MacroRecord, PriceRecord, asof_backward};
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model input columns, in the order values are stored in each row
pub const FEATURE_COLUMNS: [&str; 17] = [
    "open",
    "high",
    "low",
    "volume",
    "ma_10",
    "ma_50",
    "daily_change",
    "volatility_10",
    "rsi_14",
    "bb_high",
    "bb_low",
    "momentum_10",
    "cumulative_price_volume",
    "cumulative_volume",
    "vwap",
    "crude_oil",
    "fed_funds_rate",
];

/// Longest trailing window used by any indicator
pub const LONGEST_WINDOW: usize = 50;

/// One model-ready row: feature values plus the date and target close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub values: Vec<f64>,
}

/// Chronologically ordered feature rows sharing one column layout
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl Default for FeatureFrame {
    fn default() -> Self {
        Self {
            columns: FEATURE_COLUMNS.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }
}

impl FeatureFrame {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Value of a named column in a row
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.values.get(col)).copied()
    }

    /// Feature matrix, one `Vec` per row
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    /// Target closes aligned with [`FeatureFrame::matrix`]
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Replace non-finite values column by column: forward fill, then backward
    /// fill what is still missing at the start
    pub fn fill_missing(&mut self) {
        for col in 0..self.columns.len() {
            let mut last: Option<f64> = None;
            for row in &mut self.rows {
                let v = &mut row.values[col];
                if v.is_finite() {
                    last = Some(*v);
                } else if let Some(prev) = last {
                    *v = prev;
                }
            }

            let mut next: Option<f64> = None;
            for row in self.rows.iter_mut().rev() {
                let v = &mut row.values[col];
                if v.is_finite() {
                    next = Some(*v);
                } else if let Some(following) = next {
                    *v = following;
                }
            }
        }
    }
}

/// Build the feature frame from a price series and macro records
///
/// Rows whose trailing windows are incomplete (or whose indicators are
/// undefined) are dropped, then each remaining row is joined with the macro
/// record in force on its date. Rows with no macro record in force are
/// dropped, so empty macro data yields an empty frame.
pub fn build_feature_frame(prices: &[PriceRecord], macro_records: &[MacroRecord]) -> Result<FeatureFrame> {
    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
    let volumes: Vec<f64> = prices.iter().map(|p| p.volume).collect();

    let ma_10 = indicators::sma(&closes, 10)?;
    let ma_50 = indicators::sma(&closes, LONGEST_WINDOW)?;
    let daily_change = indicators::pct_change(&closes);
    let volatility_10 = indicators::rolling_std(&closes, 10);
    let rsi_14 = indicators::rsi(&closes, 14);
    let bands = indicators::bollinger(&closes, 20, 2.0)?;
    let momentum_10 = indicators::momentum(&closes, 10);
    let vwap = indicators::cumulative_vwap(&closes, &volumes);

    let mut macro_sorted = macro_records.to_vec();
    macro_sorted.sort_by_key(|m| m.date);

    let mut frame = FeatureFrame::default();
    let mut technical_rows = 0usize;

    for (i, price) in prices.iter().enumerate() {
        let (cum_pv, cum_vol, vwap_i) = vwap[i];
        let technical = bands[i].and_then(|(bb_high, bb_low)| {
            Some([
                ma_10[i]?,
                ma_50[i]?,
                daily_change[i]?,
                volatility_10[i]?,
                rsi_14[i]?,
                bb_high,
                bb_low,
                momentum_10[i]?,
                cum_pv,
                cum_vol,
                vwap_i?,
            ])
        });

        let Some(technical) = technical else { continue };
        technical_rows += 1;

        let Some(macro_row) = asof_backward(&macro_sorted, price.date, |m| m.date) else {
            continue;
        };

        let mut values = Vec::with_capacity(FEATURE_COLUMNS.len());
        values.extend([price.open, price.high, price.low, price.volume]);
        values.extend(technical);
        values.extend([macro_row.crude_oil_price, macro_row.fed_funds_rate]);

        frame.rows.push(FeatureRow {
            date: price.date,
            close: price.close,
            values,
        });
    }

    debug!(
        "Feature frame: {} price rows, {} with full windows, {} after macro join",
        prices.len(),
        technical_rows,
        frame.len()
    );

    Ok(frame)
}
