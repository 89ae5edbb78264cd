//! Shared fixtures for the cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use campus_cache::{CacheAside, KeyValueStore, KvBackend, MemoryBackend, RawEntry, StoreError, StoreResult};
use campus_core::MetricsRegistry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
}

impl User {
    pub fn new(id: u64, email: &str, name: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            name: name.to_string(),
        }
    }
}

/// Cache over a fresh in-process backend, with metrics attached.
pub struct TestCache {
    pub backend: Arc<MemoryBackend>,
    pub cache: CacheAside,
    pub metrics: Arc<MetricsRegistry>,
}

impl TestCache {
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new(1000));
        let metrics = Arc::new(MetricsRegistry::new());
        let store = KeyValueStore::new(backend.clone());
        let cache = CacheAside::new(store, DEFAULT_TTL).with_metrics(Arc::clone(&metrics));
        Self {
            backend,
            cache,
            metrics,
        }
    }

    pub fn store(&self) -> &KeyValueStore {
        self.cache.store()
    }
}

/// Backend whose every operation fails, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

impl FailingBackend {
    fn fail<T>(&self) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl KvBackend for FailingBackend {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> StoreResult<()> {
        self.fail()
    }

    async fn del(&self, _key: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn keys(&self, _pattern: &str) -> StoreResult<Vec<String>> {
        self.fail()
    }

    async fn mget(&self, _keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        self.fail()
    }

    async fn mset(&self, _entries: &[RawEntry]) -> StoreResult<()> {
        self.fail()
    }

    async fn exists(&self, _key: &str) -> StoreResult<bool> {
        self.fail()
    }

    async fn ttl(&self, _key: &str) -> StoreResult<i64> {
        self.fail()
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.fail()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.fail()
    }
}
