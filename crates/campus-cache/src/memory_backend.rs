//! In-process key-value backend.
//!
//! Stands in for Redis when it is disabled and backs the test suites.
//! Expiry is lazy: an expired entry is dropped the next time it is looked
//! at, and `keys` sweeps the whole map.

use crate::backend::{expiry_secs, KvBackend, RawEntry};
use crate::glob::glob_match;
use crate::StoreResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
    seq: u64,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, MemoryEntry>,
    next_seq: u64,
}

impl State {
    fn live(&mut self, key: &str, now: Instant) -> Option<&MemoryEntry> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get(key)
    }

    fn insert(&mut self, key: &str, value: &str, ttl: Option<Duration>, now: Instant, max_items: usize) {
        if !self.entries.contains_key(key) && self.entries.len() >= max_items {
            self.entries.retain(|_, e| !e.is_expired(now));
            if self.entries.len() >= max_items {
                if let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone())
                {
                    debug!(key = %oldest, "Evicting oldest entry");
                    self.entries.remove(&oldest);
                }
            }
        }

        self.next_seq += 1;
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: expiry_secs(ttl).and_then(|secs| now.checked_add(Duration::from_secs(secs))),
                seq: self.next_seq,
            },
        );
    }
}

/// Bounded in-process backend with TTL and glob support.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<State>,
    max_items: usize,
}

impl MemoryBackend {
    /// Creates a backend holding at most `max_items` entries; the oldest
    /// write is evicted first.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_items: max_items.max(1),
        }
    }

    /// Number of stored entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        Ok(self.state.lock().live(key, now).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = Instant::now();
        self.state.lock().insert(key, value, ttl, now, self.max_items);
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let existed = state.live(key, now).is_some();
        state.entries.remove(key);
        Ok(existed)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.entries.retain(|_, e| !e.is_expired(now));
        Ok(state
            .entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        Ok(keys
            .iter()
            .map(|k| state.live(k, now).map(|e| e.value.clone()))
            .collect())
    }

    async fn mset(&self, entries: &[RawEntry]) -> StoreResult<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        for entry in entries {
            state.insert(&entry.key, &entry.value, entry.ttl, now, self.max_items);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self.state.lock().live(key, now).is_some())
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let now = Instant::now();
        let mut state = self.state.lock();
        Ok(match state.live(key, now) {
            None => -2,
            Some(MemoryEntry { expires_at: None, .. }) => -1,
            Some(MemoryEntry {
                expires_at: Some(at), ..
            }) => i64::try_from(at.saturating_duration_since(now).as_secs()).unwrap_or(i64::MAX),
        })
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.state.lock().entries.clear();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
