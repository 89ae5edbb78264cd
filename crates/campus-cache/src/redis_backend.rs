//! Redis-backed key-value backend.

use crate::backend::{expiry_secs, KvBackend, RawEntry};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use campus_config::RedisConfig;
use campus_core::CampusResult;
use campus_resilience::RetryPolicy;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, error, info};

/// Build a Redis connection pool without connecting.
///
/// Fails only on an unusable configuration such as a malformed URL.
pub fn build_pool(config: &RedisConfig) -> CampusResult<Pool> {
    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| StoreError::PoolBuild(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| StoreError::PoolBuild(e.to_string()))?;
    Ok(pool)
}

/// Create a Redis connection pool and verify it answers `PING`.
///
/// The check is retried with exponential backoff, up to
/// `config.connect_attempts` times.
pub async fn create_pool(config: &RedisConfig) -> CampusResult<Pool> {
    info!("Creating Redis connection pool...");

    let backend = RedisBackend::new(build_pool(config)?);
    backend.verify(config.connect_attempts).await?;

    info!("Redis connection pool created successfully");
    Ok(backend.pool)
}

/// Redis backend over a deadpool connection pool.
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds a pool from configuration and checks the server once.
    ///
    /// An unreachable server is logged, not returned: the pool connects
    /// lazily, so every later operation fails on its own and recovers when
    /// Redis comes back.
    pub async fn connect(config: &RedisConfig) -> CampusResult<Self> {
        let backend = Self::new(build_pool(config)?);
        match backend.verify(config.connect_attempts).await {
            Ok(()) => info!("Connected to Redis"),
            Err(e) => error!(error = %e, "Redis is unreachable, cache operations will fall through"),
        }
        Ok(backend)
    }

    async fn verify(&self, attempts: u32) -> StoreResult<()> {
        RetryPolicy::with_max_attempts(attempts)
            .execute(|| self.ping())
            .await
    }

    async fn conn(&self) -> StoreResult<Connection> {
        Ok(self.pool.get().await?)
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("status", &self.pool.status())
            .finish()
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        match expiry_secs(ttl) {
            Some(secs) => conn.set_ex::<_, _, ()>(key, value, secs).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        debug!("Found {} keys matching pattern '{}'", keys.len(), pattern);
        Ok(keys)
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        Ok(redis::cmd("MGET").arg(keys).query_async(&mut conn).await?)
    }

    async fn mset(&self, entries: &[RawEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for entry in entries {
            match expiry_secs(entry.ttl) {
                Some(secs) => pipe.set_ex(&entry.key, &entry.value, secs).ignore(),
                None => pipe.set(&entry.key, &entry.value).ignore(),
            };
        }

        let mut conn = self.conn().await?;
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.exists(key).await?)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.ttl(key).await?)
    }

    async fn flush_all(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("FLUSHALL").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("unexpected PING reply: {}", pong)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> RedisConfig {
        RedisConfig {
            url: url.to_string(),
            pool_size: 1,
            enabled: true,
            connect_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_create_pool_rejects_invalid_url() {
        let err = create_pool(&config("not-a-redis-url")).await.unwrap_err();
        assert_eq!(err.error_code(), "CACHE_CONNECTION_ERROR");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let err = RedisBackend::connect(&config("not-a-redis-url")).await.unwrap_err();
        assert_eq!(err.error_code(), "CACHE_CONNECTION_ERROR");
    }

    #[tokio::test]
    async fn test_create_pool_requires_a_live_server() {
        let err = create_pool(&config("redis://127.0.0.1:1")).await.unwrap_err();
        assert_eq!(err.error_code(), "CACHE_CONNECTION_ERROR");
    }

    #[tokio::test]
    async fn test_connect_tolerates_unreachable_server() {
        let backend = RedisBackend::connect(&config("redis://127.0.0.1:1")).await.unwrap();
        assert!(backend.ping().await.is_err());
        assert!(backend.get("k").await.is_err());
    }
}
