//! In-process TTL cache for macro series so repeated runs don't re-hit FRED

use crate::api::MacroSource;
use crate::data::MacroObservation;
use crate::error::Result;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a series request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub series_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeriesKey {
    pub fn new(series_id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            series_id: series_id.into(),
            start,
            end,
        }
    }
}

/// Thread-safe timed cache of series observations
#[derive(Clone)]
pub struct MacroCache {
    cache: Arc<RwLock<TimedCache<SeriesKey, Vec<MacroObservation>>>>,
}

impl MacroCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &SeriesKey) -> Option<Vec<MacroObservation>> {
        // TimedCache evicts expired entries on lookup, which needs &mut
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: SeriesKey, value: Vec<MacroObservation>) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value using the provided fetcher function
    pub async fn get_or_fetch<F, Fut>(&self, key: SeriesKey, fetcher: F) -> Result<Vec<MacroObservation>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<MacroObservation>>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for {:?}", key);
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// [`MacroSource`] decorator that serves repeated requests from a [`MacroCache`]
pub struct CachedMacroSource {
    inner: Arc<dyn MacroSource>,
    cache: MacroCache,
}

impl CachedMacroSource {
    pub fn new(inner: Arc<dyn MacroSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: MacroCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &MacroCache {
        &self.cache
    }
}

#[async_trait]
impl MacroSource for CachedMacroSource {
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>> {
        let key = SeriesKey::new(series_id, start, end);
        self.cache
            .get_or_fetch(key, || self.inner.observations(series_id, start, end))
            .await
    }
}
