//! # Campus Cache
//!
//! Cache-aside layer for the Campus API.
//!
//! [`KeyValueStore`] wraps a [`KvBackend`] (Redis in production, an
//! in-process map for local development and tests) and contains every
//! store failure: errors are logged and turned into a miss, an empty
//! result or a no-op. [`CacheAside`] builds read-through caching,
//! batch read-through and pattern invalidation on top of it, and
//! [`ResponseCacheLayer`] exposes the same behavior as `tower` middleware.

mod backend;
mod cache_aside;
pub mod cache_keys;
mod error;
pub mod glob;
mod key_value_store;
mod memory_backend;
mod redis_backend;
mod response_cache;

pub use backend::{KvBackend, RawEntry};
pub use cache_aside::{CacheAside, HITS_METRIC, MISSES_METRIC};
pub use cache_keys::Namespace;
pub use error::{StoreError, StoreResult};
pub use key_value_store::{
    CacheEntry, KeyValueStore, STORE_ERRORS_METRIC, TTL_KEY_ABSENT, TTL_NO_EXPIRY,
};
pub use memory_backend::MemoryBackend;
pub use redis_backend::{build_pool, create_pool, RedisBackend};
pub use response_cache::{
    CacheKey, RequestFingerprint, ResponseCache, ResponseCacheLayer, DEFAULT_RESPONSE_TTL,
};
