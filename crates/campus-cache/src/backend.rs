//! Raw key-value backend abstraction.

use crate::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// One pre-serialized write of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    pub value: String,
    pub ttl: Option<Duration>,
}

/// Fallible primitives of a remote key-value server.
///
/// Values are opaque strings. Implementations report every failure;
/// containment happens one level up, in `KeyValueStore`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Returns the value at `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` at `key`, with an expiry when `ttl` is given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Deletes `key`; returns whether it existed.
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// Lists live keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Returns one slot per requested key, in request order.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Applies all writes as a single atomic batch.
    async fn mset(&self, entries: &[RawEntry]) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remaining lifetime in seconds: `-2` absent, `-1` no expiry.
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    async fn flush_all(&self) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Whole seconds for a store expiry; sub-second TTLs round up to one.
/// `None` and a zero TTL both mean the key never expires.
pub(crate) fn expiry_secs(ttl: Option<Duration>) -> Option<u64> {
    let ttl = ttl.filter(|ttl| !ttl.is_zero())?;
    let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    Some(secs.max(1))
}
