//! Error-containing, typed front of a key-value backend.

use crate::backend::{KvBackend, RawEntry};
use crate::{MemoryBackend, RedisBackend};
use campus_config::{CacheConfig, RedisConfig};
use campus_core::{CampusResult, MetricsRegistry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// `ttl` result for a key that does not exist (also returned on error).
pub const TTL_KEY_ABSENT: i64 = -2;
/// `ttl` result for a key stored without expiry.
pub const TTL_NO_EXPIRY: i64 = -1;

/// Metric incremented for every contained store failure.
pub const STORE_ERRORS_METRIC: &str = "cache.store_errors";

/// One typed write of a batch.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub ttl: Option<Duration>,
}

/// Typed key-value client that never fails.
///
/// Values are stored as JSON. Every backend or (de)serialization error is
/// logged and replaced with a safe default: `None` for reads, an empty list
/// for scans, `false` for `exists`, [`TTL_KEY_ABSENT`] for `ttl`, and a
/// silent no-op for writes and deletes.
#[derive(Clone)]
pub struct KeyValueStore {
    backend: Arc<dyn KvBackend>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl KeyValueStore {
    /// Creates a store over any backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            metrics: None,
        }
    }

    /// Creates a store over a fresh in-process backend.
    #[must_use]
    pub fn in_memory(max_items: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new(max_items)))
    }

    /// Uses Redis, or the in-process backend when Redis is disabled.
    ///
    /// Only an invalid Redis configuration is an error; an unreachable
    /// server is logged and every operation degrades until it is back.
    pub async fn from_config(redis: &RedisConfig, cache: &CacheConfig) -> CampusResult<Self> {
        if redis.enabled {
            let backend = RedisBackend::connect(redis).await?;
            Ok(Self::new(Arc::new(backend)))
        } else {
            warn!("Redis is disabled, using the in-process store");
            Ok(Self::in_memory(cache.max_items))
        }
    }

    /// Records contained failures in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.increment(STORE_ERRORS_METRIC, 1);
        }
    }

    /// Reads and decodes `key`; `None` on miss or any error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!(key, error = %e, "Error getting key");
                self.record_error();
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(key, error = %e, "Error decoding cached value");
                self.record_error();
                None
            }
        }
    }

    /// Encodes and stores `value`, with an expiry when `ttl` is given.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "Error encoding value");
                self.record_error();
                return;
            }
        };

        if let Err(e) = self.backend.set(key, &raw, ttl).await {
            error!(key, error = %e, "Error setting key");
            self.record_error();
        }
    }

    /// Best-effort delete; returns whether the store accepted it.
    pub async fn del(&self, key: &str) -> bool {
        match self.backend.del(key).await {
            Ok(_) => true,
            Err(e) => {
                error!(key, error = %e, "Error deleting key");
                self.record_error();
                false
            }
        }
    }

    /// Live keys matching `pattern`; empty on error.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        match self.backend.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                error!(pattern, error = %e, "Error getting keys with pattern");
                self.record_error();
                Vec::new()
            }
        }
    }

    /// One slot per key, in order; every slot `None` on error.
    ///
    /// A value that fails to decode only empties its own slot.
    pub async fn mget<T: DeserializeOwned>(&self, keys: &[String]) -> Vec<Option<T>> {
        if keys.is_empty() {
            return Vec::new();
        }

        let raw = match self.backend.mget(keys).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(count = keys.len(), error = %e, "Error in mget operation");
                self.record_error();
                return keys.iter().map(|_| None).collect();
            }
        };

        let mut values: Vec<Option<T>> = raw
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| {
                let raw = slot?;
                serde_json::from_str(&raw)
                    .map_err(|e| {
                        error!(key = %key, error = %e, "Error decoding cached value");
                        self.record_error();
                    })
                    .ok()
            })
            .collect();
        values.resize_with(keys.len(), || None);
        values
    }

    /// Writes every entry as one atomic pipelined batch.
    ///
    /// Nothing is written when any value fails to encode.
    pub async fn mset<T: Serialize>(&self, entries: &[CacheEntry<T>]) {
        if entries.is_empty() {
            return;
        }

        let raw: Result<Vec<RawEntry>, _> = entries
            .iter()
            .map(|entry| {
                serde_json::to_string(&entry.value).map(|value| RawEntry {
                    key: entry.key.clone(),
                    value,
                    ttl: entry.ttl,
                })
            })
            .collect();

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                error!(count = entries.len(), error = %e, "Error encoding mset values");
                self.record_error();
                return;
            }
        };

        if let Err(e) = self.backend.mset(&raw).await {
            error!(count = raw.len(), error = %e, "Error in mset operation");
            self.record_error();
        }
    }

    /// Whether `key` exists; `false` on error.
    pub async fn exists(&self, key: &str) -> bool {
        match self.backend.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                error!(key, error = %e, "Error checking existence of key");
                self.record_error();
                false
            }
        }
    }

    /// Remaining seconds for `key`; [`TTL_NO_EXPIRY`] for persistent keys,
    /// [`TTL_KEY_ABSENT`] for missing keys and on error.
    pub async fn ttl(&self, key: &str) -> i64 {
        match self.backend.ttl(key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                error!(key, error = %e, "Error getting TTL for key");
                self.record_error();
                TTL_KEY_ABSENT
            }
        }
    }

    /// Removes every key in the store.
    pub async fn flush_all(&self) {
        if let Err(e) = self.backend.flush_all().await {
            error!(error = %e, "Error flushing all keys");
            self.record_error();
        }
    }

    /// Health check; `false` when the store does not answer.
    pub async fn ping(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Store health check failed");
                self.record_error();
                false
            }
        }
    }
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockKvBackend;
    use crate::StoreError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        email: String,
    }

    fn failure() -> StoreError {
        StoreError::Unavailable("connection reset".to_string())
    }

    fn failing_store(metrics: Arc<MetricsRegistry>) -> KeyValueStore {
        let mut backend = MockKvBackend::new();
        backend.expect_get().returning(|_| Err(failure()));
        backend.expect_set().returning(|_, _, _| Err(failure()));
        backend.expect_del().returning(|_| Err(failure()));
        backend.expect_keys().returning(|_| Err(failure()));
        backend.expect_mget().returning(|_| Err(failure()));
        backend.expect_mset().returning(|_| Err(failure()));
        backend.expect_exists().returning(|_| Err(failure()));
        backend.expect_ttl().returning(|_| Err(failure()));
        backend.expect_flush_all().returning(|| Err(failure()));
        backend.expect_ping().returning(|| Err(failure()));
        KeyValueStore::new(Arc::new(backend)).with_metrics(metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_typed_value() {
        let store = KeyValueStore::in_memory(100);
        let user = User { id: 7, email: "a@x.com".into() };

        store.set("user:id:7", &user, Some(Duration::from_secs(3600))).await;

        assert_eq!(store.get::<User>("user:id:7").await, Some(user));
        assert!(store.exists("user:id:7").await);
        assert_eq!(store.ttl("user:id:7").await, 3600);

        assert!(store.del("user:id:7").await);
        assert!(!store.exists("user:id:7").await);
    }

    #[tokio::test]
    async fn test_set_without_ttl_persists() {
        let store = KeyValueStore::in_memory(100);
        store.set("config", "value", None).await;
        assert_eq!(store.ttl("config").await, TTL_NO_EXPIRY);
        assert_eq!(store.ttl("missing").await, TTL_KEY_ABSENT);
    }

    #[tokio::test]
    async fn test_zero_ttl_stores_without_expiry() {
        let store = KeyValueStore::in_memory(100);
        store.set("k", &1, Some(Duration::ZERO)).await;
        assert_eq!(store.ttl("k").await, TTL_NO_EXPIRY);
        assert_eq!(store.get::<u32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let backend = Arc::new(MemoryBackend::default());
        backend.set("user:id:1", "not json", None).await.unwrap();
        let metrics = Arc::new(MetricsRegistry::new());
        let store = KeyValueStore::new(backend).with_metrics(Arc::clone(&metrics));

        assert_eq!(store.get::<User>("user:id:1").await, None);
        assert_eq!(metrics.get(STORE_ERRORS_METRIC), 1);
    }

    #[tokio::test]
    async fn test_mget_decodes_per_slot() {
        let backend = Arc::new(MemoryBackend::default());
        backend.set("a", "1", None).await.unwrap();
        backend.set("b", "oops", None).await.unwrap();
        let store = KeyValueStore::new(backend);

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values: Vec<Option<u32>> = store.mget(&keys).await;
        assert_eq!(values, vec![Some(1), None, None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mset_writes_batch_with_ttls() {
        let store = KeyValueStore::in_memory(100);
        store
            .mset(&[
                CacheEntry { key: "a".into(), value: 1, ttl: Some(Duration::from_secs(60)) },
                CacheEntry { key: "b".into(), value: 2, ttl: None },
            ])
            .await;

        assert_eq!(store.get::<u32>("a").await, Some(1));
        assert_eq!(store.ttl("a").await, 60);
        assert_eq!(store.ttl("b").await, TTL_NO_EXPIRY);
    }

    #[tokio::test]
    async fn test_errors_degrade_to_defaults() {
        let metrics = Arc::new(MetricsRegistry::new());
        let store = failing_store(Arc::clone(&metrics));
        let keys = vec!["a".to_string(), "b".to_string()];

        assert_eq!(store.get::<User>("user:id:7").await, None);
        store.set("user:id:7", &1, Some(Duration::from_secs(1))).await;
        assert!(!store.del("user:id:7").await);
        assert!(store.keys("user:*").await.is_empty());
        assert_eq!(store.mget::<u32>(&keys).await, vec![None, None]);
        store
            .mset(&[CacheEntry { key: "a".into(), value: 1, ttl: None }])
            .await;
        assert!(!store.exists("a").await);
        assert_eq!(store.ttl("a").await, TTL_KEY_ABSENT);
        store.flush_all().await;
        assert!(!store.ping().await);

        assert_eq!(metrics.get(STORE_ERRORS_METRIC), 10);
    }

    #[tokio::test]
    async fn test_empty_batches_skip_the_backend() {
        let backend = MockKvBackend::new();
        let store = KeyValueStore::new(Arc::new(backend));

        assert!(store.mget::<u32>(&[]).await.is_empty());
        store.mset::<u32>(&[]).await;
    }

    #[tokio::test]
    async fn test_from_config_without_redis_uses_memory() {
        let redis = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let store = KeyValueStore::from_config(&redis, &CacheConfig::default())
            .await
            .unwrap();
        assert!(store.ping().await);
    }
}
