//! External document sources
//!
//! Each client implements a narrow source trait so ingestion can be tested
//! without network access.

pub mod alpha_vantage;
pub mod news_api;
pub mod sec_edgar;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use alpha_vantage::{AlphaVantageClient, StatementKind, StatementRow};
pub use news_api::{NewsApiClient, NewsArticle};
pub use sec_edgar::{Filing, FilingType, SecEdgarClient};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Articles matching `query`, newest first
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<NewsArticle>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Filings of the given forms filed on or after `since`
    async fn filings(
        &self,
        ticker: &str,
        forms: &[FilingType],
        since: NaiveDate,
    ) -> Result<Vec<Filing>>;

    /// Raw text of a filing's primary document
    async fn document(&self, filing: &Filing) -> Result<String>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Quarterly reports of one statement kind, as reported
    async fn quarterly_reports(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>>;
}
