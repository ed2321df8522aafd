//! Federal Reserve Economic Data (FRED) API client
//!
//! FRED is a database maintained by the Federal Reserve Bank of St. Louis
//! containing over 800,000 economic time series from numerous sources.
//!
//! API Key: Free registration at https://fred.stlouisfed.org/docs/api/api_key.html
//! Rate Limit: 120 requests per minute

use crate::api::MacroSource;
use crate::data::MacroObservation;
use crate::error::{ForecastError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";
const DEFAULT_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(120) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// FRED series IDs used as model features
pub mod series {
    /// Federal Funds Effective Rate (monthly)
    pub const FED_FUNDS_RATE: &str = "FEDFUNDS";
    /// Crude Oil Price, West Texas Intermediate spot (daily)
    pub const OIL_WTI: &str = "DCOILWTICO";
}

/// Raw observation from a FRED series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Date of observation (YYYY-MM-DD)
    pub date: String,
    /// Value (can be "." for missing data)
    pub value: String,
}

/// FRED observations response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

/// Convert raw observations, skipping missing (`"."`) or malformed values
pub fn parse_observations(raw: &[Observation]) -> Vec<MacroObservation> {
    let mut parsed: Vec<MacroObservation> = raw
        .iter()
        .filter_map(|o| {
            let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d").ok()?;
            let value = o.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some(MacroObservation { date, value })
        })
        .collect();
    parsed.sort_by_key(|o| o.date);
    parsed
}

/// FRED API client
pub struct FredClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FredClient {
    /// Create a new FRED client
    ///
    /// # Arguments
    /// * `api_key` - FRED API key
    /// * `rate_limit` - Requests per minute (default 120)
    pub fn new(api_key: impl Into<String>, rate_limit: Option<u32>) -> Self {
        Self::with_timeout(api_key, rate_limit, Duration::from_secs(30))
    }

    /// Create a new FRED client with an explicit request timeout
    pub fn with_timeout(
        api_key: impl Into<String>,
        rate_limit: Option<u32>,
        timeout: Duration,
    ) -> Self {
        let quota = Quota::per_minute(
            rate_limit.and_then(NonZeroU32::new).unwrap_or(DEFAULT_RATE_LIMIT),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            rate_limiter,
        }
    }

    /// Create from environment variable FRED_API_KEY
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("FRED_API_KEY").map_err(|_| {
            ForecastError::ConfigError("FRED_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self::new(api_key, None))
    }

    /// Get raw observations for a series in ascending date order
    #[instrument(skip(self))]
    pub async fn get_observations(
        &self,
        series_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>> {
        self.rate_limiter.until_ready().await;

        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();
        let params = [
            ("series_id", series_id),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
            ("sort_order", "asc"),
            ("observation_start", start.as_str()),
            ("observation_end", end.as_str()),
        ];

        let url = format!("{FRED_BASE_URL}/series/observations");
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ForecastError::ApiError(format!("FRED request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ForecastError::ApiError(format!(
                "FRED API error for {series_id}: {}",
                response.status()
            )));
        }

        let data: ObservationsResponse = response.json().await.map_err(|e| {
            ForecastError::ApiError(format!("Failed to parse FRED response: {e}"))
        })?;

        debug!("FRED returned {} observations for {}", data.observations.len(), series_id);
        Ok(data.observations)
    }
}

#[async_trait]
impl MacroSource for FredClient {
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>> {
        let raw = self.get_observations(series_id, start, end).await?;
        Ok(parse_observations(&raw))
    }
}
