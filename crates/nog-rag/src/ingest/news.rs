//! News ingestion into the news CSV
//!
//! Deduplication state is an explicit value passed into and returned from
//! each ingest call.

use crate::api::news_api::{COMPANY_QUERY, SECTOR_QUERY};
use crate::api::{NewsArticle, NewsSource};
use crate::error::Result;
use async_trait::async_trait;
use chrono::DateTime;
use nog_forecast::data::NewsRefresher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Row of the news CSV
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub date: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub publisher: String,
    pub content: String,
}

impl NewsRecord {
    /// Articles without a URL cannot be deduplicated and are dropped
    pub fn from_article(article: &NewsArticle) -> Option<Self> {
        let url = article.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let date = article
            .published_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.date_naive().to_string())
                    .unwrap_or_else(|_| raw.to_string())
            })
            .unwrap_or_default();

        Some(Self {
            date,
            title: article.title.clone().unwrap_or_default(),
            description: article.description.clone().unwrap_or_default(),
            url: url.to_string(),
            publisher: article.source.name.clone().unwrap_or_default(),
            content: article.content.clone().unwrap_or_default(),
        })
    }

    /// Content when present, else the description
    pub fn body(&self) -> &str {
        let content = self.content.trim();
        if content.is_empty() || content == "nan" {
            self.description.trim()
        } else {
            content
        }
    }
}

/// URLs already stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestState {
    seen_urls: HashSet<String>,
}

impl IngestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[NewsRecord]) -> Self {
        Self {
            seen_urls: records.iter().map(|r| r.url.clone()).collect(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_urls.is_empty()
    }
}

/// Keep the articles whose URL has not been seen, in order, and return the
/// updated state
pub fn dedupe_articles(
    articles: &[NewsArticle],
    mut state: IngestState,
) -> (Vec<NewsRecord>, IngestState) {
    let mut fresh = Vec::new();
    for record in articles.iter().filter_map(NewsRecord::from_article) {
        if state.seen_urls.insert(record.url.clone()) {
            fresh.push(record);
        }
    }
    (fresh, state)
}

/// Read the news CSV; a missing file is an empty history
pub fn read_news_csv(path: &Path) -> Result<Vec<NewsRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Append rows, writing the header only when the file is new or empty
pub fn append_news_csv(path: &Path, records: &[NewsRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fetches company and sector news and appends unseen articles to the CSV
pub struct NewsIngestor {
    source: Arc<dyn NewsSource>,
    path: PathBuf,
    page_size: u32,
}

impl NewsIngestor {
    pub fn new(source: Arc<dyn NewsSource>, path: impl Into<PathBuf>, page_size: u32) -> Self {
        Self {
            source,
            path: path.into(),
            page_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// State seeded from the URLs already in the CSV
    pub fn load_state(&self) -> Result<IngestState> {
        Ok(IngestState::from_records(&read_news_csv(&self.path)?))
    }

    /// Fetch both queries, store unseen articles and return how many were added
    #[instrument(skip(self, state), fields(seen = state.len()))]
    pub async fn ingest(&self, state: IngestState) -> Result<(usize, IngestState)> {
        let mut articles = self.source.search(COMPANY_QUERY, self.page_size).await?;
        articles.extend(self.source.search(SECTOR_QUERY, self.page_size).await?);

        let (fresh, state) = dedupe_articles(&articles, state);
        append_news_csv(&self.path, &fresh)?;

        info!(
            "Fetched {} articles, stored {} new ones",
            articles.len(),
            fresh.len()
        );
        Ok((fresh.len(), state))
    }
}

#[async_trait]
impl NewsRefresher for NewsIngestor {
    async fn refresh_news(&self) -> std::result::Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.load_state()?;
        let (added, _) = self.ingest(state).await?;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockNewsSource;
    use crate::error::RagError;
    use tempfile::TempDir;

    fn article(url: &str, title: &str) -> NewsArticle {
        NewsArticle {
            title: Some(title.to_string()),
            description: Some(format!("{title} description")),
            url: Some(url.to_string()),
            published_at: Some("2024-05-01T12:30:00Z".to_string()),
            ..NewsArticle::default()
        }
    }

    #[test]
    fn test_record_from_article() {
        let record = NewsRecord::from_article(&article("https://x/1", "Deal")).unwrap();
        assert_eq!(record.date, "2024-05-01");
        assert_eq!(record.body(), "Deal description");

        let no_url = NewsArticle {
            url: None,
            ..article("", "t")
        };
        assert!(NewsRecord::from_article(&no_url).is_none());
    }

    #[test]
    fn test_dedupe_threads_state() {
        let batch = vec![article("https://x/1", "a"), article("https://x/1", "a again"), article("https://x/2", "b")];
        let (fresh, state) = dedupe_articles(&batch, IngestState::new());
        assert_eq!(fresh.len(), 2);
        assert_eq!(state.len(), 2);

        let (fresh, state) = dedupe_articles(&[article("https://x/2", "b"), article("https://x/3", "c")], state);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].url, "https://x/3");
        assert!(state.contains("https://x/1"));
    }

    #[test]
    fn test_csv_append_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/news.csv");
        let first = NewsRecord::from_article(&article("https://x/1", "a")).unwrap();
        let second = NewsRecord::from_article(&article("https://x/2", "b")).unwrap();

        append_news_csv(&path, std::slice::from_ref(&first)).unwrap();
        append_news_csv(&path, std::slice::from_ref(&second)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,title,description,url,publisher,content\n"));
        assert_eq!(text.matches("date,title").count(), 1);
        assert_eq!(read_news_csv(&path).unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_ingest_skips_known_urls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("news.csv");

        let mut source = MockNewsSource::new();
        source.expect_search().times(4).returning(|query, _| {
            if query == COMPANY_QUERY {
                Ok(vec![article("https://x/nog", "NOG update")])
            } else {
                Ok(vec![article("https://x/oil", "Crude rallies"), article("https://x/nog", "NOG update")])
            }
        });

        let ingestor = NewsIngestor::new(Arc::new(source), &path, 50);
        let (added, state) = ingestor.ingest(IngestState::new()).await.unwrap();
        assert_eq!(added, 2);

        let (added, _) = ingestor.ingest(state).await.unwrap();
        assert_eq!(added, 0);
        assert_eq!(read_news_csv(&path).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_news_reads_state_from_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("news.csv");
        append_news_csv(&path, &[NewsRecord::from_article(&article("https://x/nog", "old")).unwrap()]).unwrap();

        let mut source = MockNewsSource::new();
        source
            .expect_search()
            .returning(|_, _| Ok(vec![article("https://x/nog", "old"), article("https://x/new", "new")]));

        let ingestor = NewsIngestor::new(Arc::new(source), &path, 50);
        assert_eq!(ingestor.refresh_news().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_news_surfaces_errors() {
        let dir = TempDir::new().unwrap();
        let mut source = MockNewsSource::new();
        source
            .expect_search()
            .returning(|_, _| Err(RagError::NewsApiError("apiKeyInvalid".to_string())));

        let ingestor = NewsIngestor::new(Arc::new(source), dir.path().join("news.csv"), 50);
        let err = ingestor.refresh_news().await.unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid"));
        assert!(!ingestor.path().exists());
    }
}
