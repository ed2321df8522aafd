//! NewsAPI client for company and sector headlines

use super::NewsSource;
use crate::error::{RagError, Result};
use async_trait::async_trait;
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

const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
const DEFAULT_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Query for articles about the company itself
pub const COMPANY_QUERY: &str = r#""Northern Oil and Gas" OR "NOG Inc" OR "NOG stock""#;
/// Query for oil and energy sector coverage
pub const SECTOR_QUERY: &str = r#""oil stock" OR "energy sector" OR "crude oil""#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Article as returned by the `everything` endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: ArticleSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    code: Option<String>,
    message: Option<String>,
}

/// Interpret an `everything` response body
pub fn parse_everything(body: &str) -> Result<Vec<NewsArticle>> {
    let response: EverythingResponse = serde_json::from_str(body)?;

    if response.status != "ok" {
        if response.code.as_deref() == Some("rateLimited") {
            return Err(RagError::RateLimitExceeded {
                provider: "NewsAPI".to_string(),
            });
        }
        return Err(RagError::NewsApiError(
            response
                .message
                .unwrap_or_else(|| format!("status {}", response.status)),
        ));
    }

    Ok(response.articles)
}

/// NewsAPI client
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(DEFAULT_RATE_LIMIT)));
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

    /// Create from environment variable NEWS_API_KEY
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("NEWS_API_KEY").map_err(|_| {
            RagError::ConfigError("NEWS_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, timeout))
    }

    /// Search all articles, sorted by publish time
    #[instrument(skip(self))]
    pub async fn everything(&self, query: &str, page_size: u32) -> Result<Vec<NewsArticle>> {
        self.rate_limiter.until_ready().await;

        let page_size = page_size.to_string();
        let params = [
            ("q", query),
            ("apiKey", self.api_key.as_str()),
            ("pageSize", page_size.as_str()),
            ("sortBy", "publishedAt"),
        ];

        let response = self
            .client
            .get(NEWS_API_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| RagError::NewsApiError(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() == 429 {
            return Err(RagError::RateLimitExceeded {
                provider: "NewsAPI".to_string(),
            });
        }

        let articles = parse_everything(&body)?;
        debug!("NewsAPI returned {} articles", articles.len());
        Ok(articles)
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<NewsArticle>> {
        self.everything(query, page_size).await
    }
}
