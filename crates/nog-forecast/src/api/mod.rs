//! Market and macro data sources

pub mod fred;
pub mod yahoo;

use crate::data::{MacroObservation, PriceRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use fred::{FredClient, series as fred_series};
pub use yahoo::YahooFinanceClient;

/// Source of daily price bars
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily bars for `ticker` between `start` and `end` (inclusive), oldest first
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>>;
}

/// Source of macroeconomic series observations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MacroSource: Send + Sync {
    /// Numeric observations of `series_id` between `start` and `end`, oldest first.
    /// Missing observations are omitted.
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>>;
}
