//! SEC EDGAR client for company filings
//!
//! Rate limit: 10 requests per second (SEC fair access policy).
//! Every request must carry a User-Agent naming the requester and a contact.

use super::FilingSource;
use crate::error::{RagError, Result};
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
use tracing::{debug, instrument, warn};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const SEC_BASE_URL: &str = "https://data.sec.gov";
const SEC_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";
const SEC_COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SEC_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};
const DEFAULT_USER_AGENT: &str = "nog-toolkit (nog-toolkit@example.com)";

/// Periodic report forms collected for the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilingType {
    /// Annual report
    #[serde(rename = "10-K")]
    Form10K,
    /// Quarterly report
    #[serde(rename = "10-Q")]
    Form10Q,
}

impl FilingType {
    pub const PERIODIC: [FilingType; 2] = [FilingType::Form10K, FilingType::Form10Q];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilingType::Form10K => "10-K",
            FilingType::Form10Q => "10-Q",
        }
    }

    pub fn parse(form: &str) -> Option<Self> {
        match form {
            "10-K" => Some(FilingType::Form10K),
            "10-Q" => Some(FilingType::Form10Q),
            _ => None,
        }
    }
}

/// One filing selected for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    pub cik: String,
    pub accession_number: String,
    pub form: FilingType,
    pub filing_date: NaiveDate,
    pub primary_document: String,
}

impl Filing {
    /// Archive URL of the primary document
    pub fn document_url(&self) -> String {
        let cik = self.cik.trim_start_matches('0');
        let accession = self.accession_number.replace('-', "");
        format!(
            "{SEC_ARCHIVES_URL}/{cik}/{accession}/{}",
            self.primary_document
        )
    }
}

/// Submissions response (only the fields used here)
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySubmissions {
    pub cik: String,
    pub name: String,
    pub filings: FilingsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilingsData {
    pub recent: RecentFilings,
}

/// Column-oriented list of recent filings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// Pad a CIK to the 10 digits used by the submissions API
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim_start_matches('0'))
}

/// Find the CIK of `ticker` in the company tickers listing
pub fn find_cik(listing: &serde_json::Value, ticker: &str) -> Option<String> {
    listing.as_object()?.values().find_map(|company| {
        let company_ticker = company.get("ticker")?.as_str()?;
        if !company_ticker.eq_ignore_ascii_case(ticker) {
            return None;
        }
        let cik = company.get("cik_str")?;
        cik.as_u64()
            .map(|n| n.to_string())
            .or_else(|| cik.as_str().map(str::to_string))
    })
}

/// Filings of the requested forms filed on or after `since`, newest first
pub fn select_filings(
    cik: &str,
    recent: &RecentFilings,
    forms: &[FilingType],
    since: NaiveDate,
) -> Vec<Filing> {
    let count = recent
        .accession_number
        .len()
        .min(recent.filing_date.len())
        .min(recent.form.len())
        .min(recent.primary_document.len());

    let mut filings: Vec<Filing> = (0..count)
        .filter_map(|i| {
            let form = FilingType::parse(&recent.form[i]).filter(|f| forms.contains(f))?;
            let filing_date = match NaiveDate::parse_from_str(&recent.filing_date[i], "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    warn!("Skipping filing with bad date {:?}: {}", recent.filing_date[i], e);
                    return None;
                }
            };
            if filing_date < since || recent.primary_document[i].is_empty() {
                return None;
            }
            Some(Filing {
                cik: cik.to_string(),
                accession_number: recent.accession_number[i].clone(),
                form,
                filing_date,
                primary_document: recent.primary_document[i].clone(),
            })
        })
        .collect();

    filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
    filings
}

/// SEC EDGAR API client
pub struct SecEdgarClient {
    client: Client,
    user_agent: String,
    rate_limiter: SharedRateLimiter,
}

impl SecEdgarClient {
    /// Create a client identifying itself with `user_agent`
    /// (e.g. `"MyApp contact@example.com"`)
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(SEC_RATE_LIMIT)));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            user_agent: user_agent.into(),
            rate_limiter,
        }
    }

    /// Create from environment variable SEC_USER_AGENT, with a generic fallback
    pub fn from_env(timeout: Duration) -> Self {
        let user_agent =
            std::env::var("SEC_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        Self::new(user_agent, timeout)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| RagError::SecError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::SecError(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }
        Ok(response)
    }

    /// Get CIK number from stock ticker
    #[instrument(skip(self))]
    pub async fn get_cik(&self, ticker: &str) -> Result<String> {
        let listing: serde_json::Value = self.get(SEC_COMPANY_TICKERS_URL).await?.json().await?;
        find_cik(&listing, ticker).ok_or_else(|| RagError::InvalidSymbol(ticker.to_string()))
    }

    /// Get company submissions (filing history)
    #[instrument(skip(self))]
    pub async fn get_company_submissions(&self, cik: &str) -> Result<CompanySubmissions> {
        let url = format!("{SEC_BASE_URL}/submissions/CIK{}.json", pad_cik(cik));
        let submissions = self.get(&url).await?.json().await?;
        Ok(submissions)
    }

    /// Download a filing's primary document as text
    #[instrument(skip(self, filing), fields(accession = %filing.accession_number))]
    pub async fn download_document(&self, filing: &Filing) -> Result<String> {
        let text = self.get(&filing.document_url()).await?.text().await?;
        debug!("Downloaded {} bytes", text.len());
        Ok(text)
    }
}

#[async_trait]
impl FilingSource for SecEdgarClient {
    async fn filings(
        &self,
        ticker: &str,
        forms: &[FilingType],
        since: NaiveDate,
    ) -> Result<Vec<Filing>> {
        let cik = self.get_cik(ticker).await?;
        let submissions = self.get_company_submissions(&cik).await?;
        Ok(select_filings(&cik, &submissions.filings.recent, forms, since))
    }

    async fn document(&self, filing: &Filing) -> Result<String> {
        self.download_document(filing).await
    }
}
