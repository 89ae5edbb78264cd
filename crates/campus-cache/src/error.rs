//! Key-value store error types.

use campus_core::CampusError;
use thiserror::Error;

/// Result type for raw backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a [`KvBackend`](crate::KvBackend).
///
/// These never leave [`KeyValueStore`](crate::KeyValueStore); they are
/// logged there and replaced by a safe default.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No connection could be checked out of the pool.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// The pool could not be built from configuration.
    #[error("Failed to build Redis pool: {0}")]
    PoolBuild(String),

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CampusError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Pool(_) | StoreError::PoolBuild(_) | StoreError::Unavailable(_) => {
                CampusError::CacheConnection(err.to_string())
            }
            StoreError::Redis(ref e) if e.is_connection_refusal() || e.is_io_error() => {
                CampusError::CacheConnection(err.to_string())
            }
            StoreError::Redis(_) | StoreError::Serialization(_) => {
                CampusError::CacheOperation(err.to_string())
            }
        }
    }
}
