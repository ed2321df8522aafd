//! Alpha Vantage client for quarterly financial statements

use super::StatementSource;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const BASE_URL: &str = "https://www.alphavantage.co/query";
// Free tier: 5 requests per minute
const FREE_TIER_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(5) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// One quarterly report: field name to reported value
pub type StatementRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    IncomeStatement,
    BalanceSheet,
}

impl StatementKind {
    /// Alpha Vantage `function` parameter
    pub fn function(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "INCOME_STATEMENT",
            StatementKind::BalanceSheet => "BALANCE_SHEET",
        }
    }
}

/// Extract `quarterlyReports` from a statement response
pub fn parse_quarterly_reports(data: &serde_json::Value) -> Result<Vec<StatementRow>> {
    if let Some(error) = data.get("Error Message") {
        return Err(RagError::AlphaVantageError(error.to_string()));
    }

    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(RagError::RateLimitExceeded {
            provider: "Alpha Vantage".to_string(),
        });
    }

    let reports = data
        .get("quarterlyReports")
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            RagError::AlphaVantageError(format!("no quarterlyReports in response: {data}"))
        })?;

    Ok(reports
        .iter()
        .filter_map(|report| report.as_object())
        .map(|fields| {
            fields
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .collect())
}

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (free tier: 5)
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(FREE_TIER_RATE_LIMIT));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create from environment variable ALPHA_VANTAGE_API_KEY with the free tier limit
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("ALPHA_VANTAGE_API_KEY").map_err(|_| {
            RagError::ConfigError("ALPHA_VANTAGE_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self::new(api_key, FREE_TIER_RATE_LIMIT.get(), timeout))
    }

    /// Quarterly reports of one statement, newest first as reported
    #[instrument(skip(self))]
    pub async fn get_quarterly_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("function", kind.function()),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        let response = self.client.get(BASE_URL).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(RagError::AlphaVantageError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response.json().await?;
        parse_quarterly_reports(&data)
    }
}

#[async_trait]
impl StatementSource for AlphaVantageClient {
    async fn quarterly_reports(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>> {
        self.get_quarterly_statement(symbol, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quarterly_reports() {
        let data = json!({
            "symbol": "NOG",
            "annualReports": [],
            "quarterlyReports": [
                {"fiscalDateEnding": "2024-03-31", "totalRevenue": "396000000", "netIncome": "None"},
                {"fiscalDateEnding": "2023-12-31", "totalRevenue": "579000000", "netIncome": null}
            ]
        });

        let reports = parse_quarterly_reports(&data).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["fiscalDateEnding"], "2024-03-31");
        assert_eq!(reports[0]["netIncome"], "None");
        assert_eq!(reports[1]["netIncome"], "");
    }

    #[test]
    fn test_parse_errors() {
        let limited = json!({"Note": "Thank you for using Alpha Vantage!"});
        assert!(matches!(
            parse_quarterly_reports(&limited),
            Err(RagError::RateLimitExceeded { .. })
        ));

        let invalid = json!({"Error Message": "Invalid API call"});
        assert!(matches!(
            parse_quarterly_reports(&invalid),
            Err(RagError::AlphaVantageError(_))
        ));

        assert!(parse_quarterly_reports(&json!({})).is_err());
    }

    #[test]
    fn test_statement_function() {
        assert_eq!(StatementKind::IncomeStatement.function(), "INCOME_STATEMENT");
        assert_eq!(StatementKind::BalanceSheet.function(), "BALANCE_SHEET");
    }
}
