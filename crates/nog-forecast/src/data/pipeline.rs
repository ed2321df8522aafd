//! Data pipeline: refresh the price cache, fetch macro data, build features

use super::macro_data::{MacroRecord, merge_macro_series};
use super::prices::{PriceCache, PriceRecord};
use crate::api::{MacroSource, PriceSource, fred_series};
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureFrame, build_feature_frame};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Refreshes the news corpus on every pipeline run
///
/// Failures are reported in the pipeline output and never abort it.
#[async_trait]
pub trait NewsRefresher: Send + Sync {
    /// Fetch and store new articles, returning how many were added
    async fn refresh_news(&self) -> std::result::Result<usize, Box<dyn std::error::Error + Send + Sync>>;
}

/// What happened to the price cache during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PriceRefreshOutcome {
    NotRequested,
    Appended { rows: usize },
    UpToDate,
    /// The fetch failed and cached data was used instead
    Degraded { error: String },
}

impl PriceRefreshOutcome {
    /// Whether fresh data was successfully checked for
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Appended { .. } | Self::UpToDate)
    }
}

/// What happened to the news corpus during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NewsRefreshOutcome {
    Skipped,
    Refreshed { articles: usize },
    Failed { error: String },
}

/// Parameters of one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataRequest {
    /// Fetch new bars before building features
    pub refresh: bool,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Everything produced by a pipeline run
#[derive(Debug, Clone)]
pub struct DataOutput {
    pub prices: Vec<PriceRecord>,
    pub macro_records: Vec<MacroRecord>,
    pub frame: FeatureFrame,
    pub price_refresh: PriceRefreshOutcome,
    pub news_refresh: NewsRefreshOutcome,
}

pub struct DataPipeline {
    config: Arc<ForecastConfig>,
    prices: Arc<dyn PriceSource>,
    macros: Arc<dyn MacroSource>,
    news: Option<Arc<dyn NewsRefresher>>,
    cache: PriceCache,
}

impl DataPipeline {
    pub fn new(
        config: Arc<ForecastConfig>,
        prices: Arc<dyn PriceSource>,
        macros: Arc<dyn MacroSource>,
    ) -> Self {
        let cache = PriceCache::new(config.price_cache_path());
        Self {
            config,
            prices,
            macros,
            news: None,
            cache,
        }
    }

    /// Attach a news refresher, run on every call to [`DataPipeline::run`]
    pub fn with_news_refresher(mut self, news: Arc<dyn NewsRefresher>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Run the pipeline, refreshing prices first when requested. News is
    /// refreshed whatever the flag.
    #[instrument(skip(self), fields(ticker = %self.config.ticker))]
    pub async fn run(&self, request: DataRequest) -> Result<DataOutput> {
        let today = Local::now().date_naive();

        let price_refresh = if request.refresh {
            self.refresh_prices(today).await?
        } else {
            PriceRefreshOutcome::NotRequested
        };
        let news_refresh = self.refresh_news().await;

        if !self.cache.exists() {
            return Err(ForecastError::EmptyData(format!(
                "no cached price history at {}",
                self.cache.path().display()
            )));
        }

        let prices = self.cache.read_range(request.start, request.end)?;
        let (Some(first), Some(last)) = (prices.first(), prices.last()) else {
            return Err(ForecastError::EmptyData("no price rows in the requested range".to_string()));
        };

        let macro_start = first.date - Duration::days(self.config.macro_lookback_days);
        let macro_records = self.fetch_macro(macro_start, last.date.max(today)).await?;
        let frame = build_feature_frame(&prices, &macro_records)?;

        info!("Successfully built feature frame with {} rows", frame.len());

        Ok(DataOutput {
            prices,
            macro_records,
            frame,
            price_refresh,
            news_refresh,
        })
    }

    /// Append bars after the last cached date, up to the session before
    /// `today` so an unfinished intraday bar is never cached. A fetch failure
    /// degrades to cached data; a corrupt cache is fatal.
    pub async fn refresh_prices(&self, today: NaiveDate) -> Result<PriceRefreshOutcome> {
        let start = match self.cache.last_date()? {
            Some(last) => last + Duration::days(1),
            None => self.config.history_start,
        };
        let end = today - Duration::days(1);

        if start > end {
            info!("Price cache already up to date");
            return Ok(PriceRefreshOutcome::UpToDate);
        }

        match self.prices.daily_history(&self.config.ticker, start, end).await {
            Ok(bars) => {
                let rows = self.cache.append(&bars)?;
                if rows == 0 {
                    Ok(PriceRefreshOutcome::UpToDate)
                } else {
                    Ok(PriceRefreshOutcome::Appended { rows })
                }
            }
            Err(e) => {
                warn!("Price fetch failed, falling back to cached data: {}", e);
                Ok(PriceRefreshOutcome::Degraded { error: e.to_string() })
            }
        }
    }

    async fn refresh_news(&self) -> NewsRefreshOutcome {
        let Some(news) = &self.news else {
            return NewsRefreshOutcome::Skipped;
        };

        match news.refresh_news().await {
            Ok(articles) => {
                info!("News refresh added {} articles", articles);
                NewsRefreshOutcome::Refreshed { articles }
            }
            Err(e) => {
                warn!("News refresh failed: {}", e);
                NewsRefreshOutcome::Failed { error: e.to_string() }
            }
        }
    }

    /// Crude oil merged with the fed funds rate in force on each oil date
    async fn fetch_macro(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<MacroRecord>> {
        let oil = self.macros.observations(fred_series::OIL_WTI, start, end).await?;
        let fed = self.macros.observations(fred_series::FED_FUNDS_RATE, start, end).await?;
        let merged = merge_macro_series(&oil, &fed);

        if merged.is_empty() {
            warn!("No macro data between {} and {}", start, end);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockMacroSource, MockPriceSource};
    use crate::testing::{FakeMacroSource, synthetic_prices};
    use tempfile::TempDir;

    struct FailingNews;

    #[async_trait]
    impl NewsRefresher for FailingNews {
        async fn refresh_news(&self) -> std::result::Result<usize, Box<dyn std::error::Error + Send + Sync>> {
            Err("news api down".into())
        }
    }

    struct CountingNews(usize);

    #[async_trait]
    impl NewsRefresher for CountingNews {
        async fn refresh_news(&self) -> std::result::Result<usize, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.0)
        }
    }

    fn config(dir: &TempDir) -> Arc<ForecastConfig> {
        Arc::new(ForecastConfig::builder().data_dir(dir.path()).build().unwrap())
    }

    fn seeded_pipeline(dir: &TempDir, prices: MockPriceSource) -> DataPipeline {
        let config = config(dir);
        PriceCache::new(config.price_cache_path())
            .write(&synthetic_prices(120))
            .unwrap();
        DataPipeline::new(config, Arc::new(prices), Arc::new(FakeMacroSource))
    }

    #[tokio::test]
    async fn test_cached_run_without_refresh() {
        let dir = TempDir::new().unwrap();
        let mut prices = MockPriceSource::new();
        prices.expect_daily_history().never();
        let pipeline = seeded_pipeline(&dir, prices);

        let out = pipeline.run(DataRequest::default()).await.unwrap();
        assert_eq!(out.prices.len(), 120);
        assert!(!out.frame.is_empty());
        assert_eq!(out.price_refresh, PriceRefreshOutcome::NotRequested);
        assert_eq!(out.news_refresh, NewsRefreshOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_news_refreshes_without_price_refresh() {
        let dir = TempDir::new().unwrap();
        let mut prices = MockPriceSource::new();
        prices.expect_daily_history().never();
        let pipeline = seeded_pipeline(&dir, prices).with_news_refresher(Arc::new(CountingNews(3)));

        let out = pipeline.run(DataRequest::default()).await.unwrap();
        assert_eq!(out.price_refresh, PriceRefreshOutcome::NotRequested);
        assert_eq!(out.news_refresh, NewsRefreshOutcome::Refreshed { articles: 3 });
    }

    #[tokio::test]
    async fn test_refresh_stops_at_previous_session() {
        let dir = TempDir::new().unwrap();
        let cached = synthetic_prices(120);
        let today = cached[119].date + Duration::days(10);

        let mut prices = MockPriceSource::new();
        prices
            .expect_daily_history()
            .times(1)
            .returning(move |_, _, end| {
                assert_eq!(end, today - Duration::days(1));
                Ok(Vec::new())
            });
        let pipeline = seeded_pipeline(&dir, prices);

        let outcome = pipeline.refresh_prices(today).await.unwrap();
        assert_eq!(outcome, PriceRefreshOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_cache_through_yesterday_skips_fetch() {
        let dir = TempDir::new().unwrap();
        let cached = synthetic_prices(120);
        let today = cached[119].date + Duration::days(1);

        let mut prices = MockPriceSource::new();
        prices.expect_daily_history().never();
        let pipeline = seeded_pipeline(&dir, prices);

        let outcome = pipeline.refresh_prices(today).await.unwrap();
        assert_eq!(outcome, PriceRefreshOutcome::UpToDate);
        assert_eq!(pipeline.cache().last_date().unwrap(), Some(cached[119].date));
    }

    #[tokio::test]
    async fn test_refresh_appends_new_bars() {
        let dir = TempDir::new().unwrap();
        let cached = synthetic_prices(120);
        let last = cached[119];

        let mut prices = MockPriceSource::new();
        prices
            .expect_daily_history()
            .times(1)
            .returning(move |_, start, _| {
                assert_eq!(start, last.date + Duration::days(1));
                Ok(vec![PriceRecord {
                    date: start,
                    close: last.close + 0.5,
                    ..last
                }])
            });
        let pipeline = seeded_pipeline(&dir, prices).with_news_refresher(Arc::new(CountingNews(4)));

        let out = pipeline
            .run(DataRequest {
                refresh: true,
                ..DataRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(out.price_refresh, PriceRefreshOutcome::Appended { rows: 1 });
        assert_eq!(out.news_refresh, NewsRefreshOutcome::Refreshed { articles: 4 });
        assert_eq!(out.prices.len(), 121);
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_cache() {
        let dir = TempDir::new().unwrap();
        let mut prices = MockPriceSource::new();
        prices
            .expect_daily_history()
            .returning(|_, _, _| Err(ForecastError::YahooFinanceError("503".to_string())));
        let pipeline = seeded_pipeline(&dir, prices).with_news_refresher(Arc::new(FailingNews));

        let out = pipeline
            .run(DataRequest {
                refresh: true,
                ..DataRequest::default()
            })
            .await
            .unwrap();
        assert!(matches!(out.price_refresh, PriceRefreshOutcome::Degraded { .. }));
        assert!(!out.price_refresh.succeeded());
        assert!(matches!(out.news_refresh, NewsRefreshOutcome::Failed { .. }));
        assert_eq!(out.prices.len(), 120);
        assert!(!out.frame.is_empty());
    }

    #[tokio::test]
    async fn test_date_bounds_filter_cache() {
        let dir = TempDir::new().unwrap();
        let pipeline = seeded_pipeline(&dir, MockPriceSource::new());
        let cached = synthetic_prices(120);

        let out = pipeline
            .run(DataRequest {
                refresh: false,
                start: Some(cached[10].date),
                end: Some(cached[99].date),
            })
            .await
            .unwrap();
        assert_eq!(out.prices.len(), 90);
        assert_eq!(out.prices[0].date, cached[10].date);
    }

    #[tokio::test]
    async fn test_missing_cache_without_refresh_is_empty_data() {
        let dir = TempDir::new().unwrap();
        let pipeline = DataPipeline::new(config(&dir), Arc::new(MockPriceSource::new()), Arc::new(FakeMacroSource));

        let err = pipeline.run(DataRequest::default()).await.unwrap_err();
        assert!(matches!(err, ForecastError::EmptyData(_)));
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        std::fs::create_dir_all(config.price_cache_path().parent().unwrap()).unwrap();
        std::fs::write(config.price_cache_path(), "Close,Open\n1,2\n").unwrap();
        let pipeline = DataPipeline::new(config, Arc::new(MockPriceSource::new()), Arc::new(FakeMacroSource));

        let err = pipeline
            .run(DataRequest {
                refresh: true,
                ..DataRequest::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[tokio::test]
    async fn test_macro_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        PriceCache::new(config.price_cache_path())
            .write(&synthetic_prices(80))
            .unwrap();

        let mut macros = MockMacroSource::new();
        macros
            .expect_observations()
            .returning(|_, _, _| Err(ForecastError::ApiError("FRED down".to_string())));
        let pipeline = DataPipeline::new(config, Arc::new(MockPriceSource::new()), Arc::new(macros));

        let err = pipeline.run(DataRequest::default()).await.unwrap_err();
        assert!(!err.is_corruption());
    }

    #[tokio::test]
    async fn test_macro_window_starts_before_prices() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let prices = synthetic_prices(80);
        let first = prices[0].date;
        PriceCache::new(config.price_cache_path()).write(&prices).unwrap();

        let mut macros = MockMacroSource::new();
        macros.expect_observations().times(2).returning(move |_, start, _| {
            assert_eq!(start, first - Duration::days(45));
            Ok(Vec::new())
        });
        let pipeline = DataPipeline::new(config, Arc::new(MockPriceSource::new()), Arc::new(macros));

        // No macro data: the frame is empty but the run itself succeeds
        let out = pipeline.run(DataRequest::default()).await.unwrap();
        assert!(out.frame.is_empty());
    }
}
