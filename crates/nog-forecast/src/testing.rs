//! Deterministic fixtures shared by unit tests

use crate::api::MacroSource;
use crate::data::{MacroObservation, MacroRecord, PriceRecord};
use crate::error::Result;
use crate::model::GbmParams;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// A fixed "now" well after every synthetic price date (a Wednesday)
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 12)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

/// Small, fast model parameters for tests
pub fn fast_params() -> GbmParams {
    GbmParams {
        n_trees: 30,
        max_depth: 3,
        learning_rate: 0.1,
        ..GbmParams::default()
    }
}

/// `n` business-day bars from 2023-01-02: an upward drift with a short
/// oscillation so every 14-day window contains both gains and losses
pub fn synthetic_prices(n: usize) -> Vec<PriceRecord> {
    let mut date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        let t = i as f64;
        let close = 30.0 + 0.05 * t + 2.0 * (t * 0.9).sin();
        out.push(PriceRecord {
            date,
            open: close - 0.3 * (t * 0.5).cos(),
            high: close + 0.8,
            low: close - 0.8,
            close,
            volume: 1_000_000.0 + 50_000.0 * (t * 0.3).sin(),
        });
        date += Duration::days(1);
    }
    out
}

fn oil_price(date: NaiveDate) -> f64 {
    70.0 + 5.0 * (f64::from(date.ordinal()) / 20.0).sin()
}

fn fed_rate(date: NaiveDate) -> f64 {
    4.0 + 0.25 * f64::from(date.month() % 4)
}

/// One macro record per price date
pub fn synthetic_macro(prices: &[PriceRecord]) -> Vec<MacroRecord> {
    prices
        .iter()
        .map(|p| MacroRecord {
            date: p.date,
            crude_oil_price: oil_price(p.date),
            fed_funds_rate: fed_rate(p.date),
        })
        .collect()
}

/// Offline FRED stand-in: daily oil and monthly (first of month) fed funds
pub struct FakeMacroSource;

#[async_trait]
impl MacroSource for FakeMacroSource {
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>> {
        let mut out = Vec::new();
        let mut date = start;
        while date <= end {
            match series_id {
                "DCOILWTICO" => out.push(MacroObservation {
                    date,
                    value: oil_price(date),
                }),
                "FEDFUNDS" if date.day() == 1 => out.push(MacroObservation {
                    date,
                    value: fed_rate(date),
                }),
                _ => {}
            }
            date += Duration::days(1);
        }
        Ok(out)
    }
}
