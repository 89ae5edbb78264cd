//! Read-through caching and invalidation over a [`KeyValueStore`].

use crate::cache_keys::Namespace;
use crate::key_value_store::{CacheEntry, KeyValueStore};
use campus_config::{CacheConfig, RedisConfig};
use campus_core::{CampusResult, MetricsRegistry};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Metric incremented for every key served from the store.
pub const HITS_METRIC: &str = "cache.hits";
/// Metric incremented for every key that had to be computed.
pub const MISSES_METRIC: &str = "cache.misses";

/// Cache-aside helper.
///
/// There is no same-key exclusion: concurrent misses on one key may both
/// compute and both write, the last write wins.
#[derive(Debug, Clone)]
pub struct CacheAside {
    store: KeyValueStore,
    default_ttl: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl CacheAside {
    #[must_use]
    pub fn new(store: KeyValueStore, default_ttl: Duration) -> Self {
        Self {
            store,
            default_ttl,
            metrics: None,
        }
    }

    /// Builds the store from configuration and uses the configured default TTL.
    pub async fn from_config(redis: &RedisConfig, cache: &CacheConfig) -> CampusResult<Self> {
        let store = KeyValueStore::from_config(redis, cache).await?;
        Ok(Self::new(store, cache.default_ttl()))
    }

    /// Records hits, misses and contained store errors in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.store = self.store.with_metrics(Arc::clone(&metrics));
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn record(&self, metric: &str, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.increment(metric, count as u64);
        }
    }

    /// Returns the cached value at `key`, or computes, stores and returns it.
    ///
    /// A store failure counts as a miss. A `compute` error is returned
    /// unchanged and nothing is written.
    pub async fn wrap<T, E, F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_cacheable(key, ttl, compute, |_| true).await
    }

    /// `wrap` that only serves and stores values accepted by `cacheable`.
    pub(crate) async fn wrap_cacheable<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
        cacheable: fn(&T) -> bool,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.store.get::<T>(key).await.filter(|value| cacheable(value)) {
            debug!(key, "Cache hit");
            self.record(HITS_METRIC, 1);
            return Ok(cached);
        }

        debug!(key, "Cache miss");
        self.record(MISSES_METRIC, 1);

        let value = compute().await?;
        if cacheable(&value) {
            self.store.set(key, &value, ttl).await;
        }
        Ok(value)
    }

    async fn wrap_namespace<T, E, F, Fut>(&self, namespace: Namespace, id: impl Display, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = namespace.key(id);
        self.wrap(&key, Some(self.default_ttl), compute).await
    }

    /// `wrap("user:<id>")` with the default TTL.
    pub async fn wrap_user<T, E, F, Fut>(&self, id: impl Display, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_namespace(Namespace::User, id, compute).await
    }

    /// `wrap("course:<id>")` with the default TTL.
    pub async fn wrap_course<T, E, F, Fut>(&self, id: impl Display, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_namespace(Namespace::Course, id, compute).await
    }

    /// `wrap("assignment:<id>")` with the default TTL.
    pub async fn wrap_assignment<T, E, F, Fut>(&self, id: impl Display, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_namespace(Namespace::Assignment, id, compute).await
    }

    /// `wrap("file:<id>")` with the default TTL.
    pub async fn wrap_file<T, E, F, Fut>(&self, id: impl Display, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_namespace(Namespace::File, id, compute).await
    }

    /// Deletes one key.
    pub async fn del(&self, key: &str) {
        if self.store.del(key).await {
            debug!(key, "Cache entry invalidated");
        }
    }

    /// Deletes every key matching a glob pattern; returns how many deletes
    /// the store accepted.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let keys = self.store.keys(pattern).await;
        if keys.is_empty() {
            return 0;
        }

        let deleted = join_all(keys.iter().map(|key| self.store.del(key)))
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        debug!(pattern, matched = keys.len(), deleted, "Invalidated cache entries");
        deleted
    }

    pub async fn invalidate_user(&self, id: impl Display) -> usize {
        self.invalidate_pattern(&Namespace::User.pattern(id)).await
    }

    pub async fn invalidate_course(&self, id: impl Display) -> usize {
        self.invalidate_pattern(&Namespace::Course.pattern(id)).await
    }

    pub async fn invalidate_assignment(&self, id: impl Display) -> usize {
        self.invalidate_pattern(&Namespace::Assignment.pattern(id)).await
    }

    pub async fn invalidate_file(&self, id: impl Display) -> usize {
        self.invalidate_pattern(&Namespace::File.pattern(id)).await
    }

    /// Batch read-through.
    ///
    /// Reads every key with one multi-get, then calls `compute_missing` at
    /// most once with the keys that missed (in request order, without
    /// duplicates). Whatever it returns is written back with one multi-set
    /// and merged into the result. When the multi-get fails every key
    /// counts as missed.
    pub async fn wrap_batch<T, E, F, Fut>(
        &self,
        keys: &[String],
        ttl: Option<Duration>,
        compute_missing: F,
    ) -> Result<HashMap<String, T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<String>) -> Fut,
        Fut: Future<Output = Result<HashMap<String, T>, E>>,
    {
        let cached = self.store.mget::<T>(keys).await;

        let mut results = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        let mut seen = HashSet::new();
        for (key, slot) in keys.iter().zip(cached) {
            match slot {
                Some(value) => {
                    results.insert(key.clone(), value);
                }
                None => {
                    if seen.insert(key.as_str()) {
                        missing.push(key.clone());
                    }
                }
            }
        }

        self.record(HITS_METRIC, results.len());
        self.record(MISSES_METRIC, missing.len());
        debug!(hits = results.len(), misses = missing.len(), "Batch cache lookup");

        if missing.is_empty() {
            return Ok(results);
        }

        let computed = compute_missing(missing).await?;
        let entries: Vec<CacheEntry<T>> = computed
            .into_iter()
            .map(|(key, value)| CacheEntry { key, value, ttl })
            .collect();
        self.store.mset(&entries).await;

        results.extend(entries.into_iter().map(|entry| (entry.key, entry.value)));
        Ok(results)
    }
}
