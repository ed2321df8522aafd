//! Yahoo Finance API client

use crate::api::PriceSource;
use crate::data::PriceRecord;
use crate::error::{ForecastError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    timeout: Duration,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get daily historical bars for a symbol
    #[instrument(skip(self))]
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| ForecastError::YahooFinanceError(e.to_string()))?;

        // Inclusive end: ask for everything up to the following midnight
        let start_odt = to_offset_datetime(start)?;
        let end_odt = to_offset_datetime(end + chrono::Duration::days(1))?;

        let response = tokio::time::timeout(
            self.timeout,
            provider.get_quote_history(symbol, start_odt, end_odt),
        )
        .await
        .map_err(|_| {
            ForecastError::YahooFinanceError(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| ForecastError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| ForecastError::YahooFinanceError(e.to_string()))?;

        let mut records: Vec<PriceRecord> = quotes
            .iter()
            .filter_map(|q| {
                let Some(timestamp) = DateTime::from_timestamp(q.timestamp as i64, 0) else {
                    warn!("Skipping quote with invalid timestamp {}", q.timestamp);
                    return None;
                };
                Some(PriceRecord {
                    date: timestamp.date_naive(),
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume as f64,
                })
            })
            .filter(|r| r.date >= start && r.date <= end)
            .collect();

        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);
        debug!("Fetched {} bars for {}", records.len(), symbol);

        Ok(records)
    }
}

fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let timestamp = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| ForecastError::YahooFinanceError(format!("Invalid timestamp: {e}")))
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>> {
        self.get_historical_quotes(ticker, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_offset_datetime() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let odt = to_offset_datetime(date).unwrap();
        assert_eq!(odt.unix_timestamp(), 1_704_153_600);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_get_historical_quotes() {
        let client = YahooFinanceClient::new();
        let end = chrono::Utc::now().date_naive();
        let start = end - chrono::Duration::days(30);
        let bars = client.get_historical_quotes("NOG", start, end).await.unwrap();

        assert!(!bars.is_empty());
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }
}
