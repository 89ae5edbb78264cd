//! Rate limiter implementation.
//!
//! Fixed windows per client key. The whole table sits behind one mutex and
//! is owned by the `RateLimiter` value, which is created once and shared by
//! handle.

use campus_config::RateLimitConfig;
use campus_core::{CampusError, CampusResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// `X-RateLimit-*` header pairs for this decision.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, String); 3] {
        let reset_in = i64::try_from(secs_ceil(self.reset_after)).unwrap_or(i64::MAX);
        let reset_at = chrono::Utc::now().timestamp().saturating_add(reset_in);
        [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", reset_at.to_string()),
        ]
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    started_at: Instant,
}

#[derive(Debug)]
struct Inner {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

/// Keyed fixed-window rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per key per `window`.
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                max_requests: max_requests.max(1),
                windows: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }

    /// Records one request for `key`.
    ///
    /// Returns `RateLimitExceeded` with the seconds left in the window when
    /// the key already used its quota.
    pub fn check(&self, key: &str) -> CampusResult<RateLimitDecision> {
        let now = Instant::now();
        let window = self.inner.window;
        let max = self.inner.max_requests;

        let mut windows = self.inner.windows.lock();
        windows.retain(|_, w| now.duration_since(w.started_at) < window);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });
        let reset_after = window.saturating_sub(now.duration_since(entry.started_at));

        if entry.count >= max {
            debug!(key, count = entry.count, "Rate limit exceeded");
            return Err(CampusError::RateLimitExceeded {
                retry_after_secs: secs_ceil(reset_after),
            });
        }

        entry.count += 1;
        Ok(RateLimitDecision {
            limit: max,
            remaining: max - entry.count,
            reset_after,
        })
    }

    /// Number of keys with an open window.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.inner.windows.lock().len()
    }
}

fn secs_ceil(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_allows_up_to_max() {
        let limiter = RateLimiter::new(Duration::from_secs(15), 3);

        assert_eq!(limiter.check("10.0.0.1").unwrap().remaining, 2);
        assert_eq!(limiter.check("10.0.0.1").unwrap().remaining, 1);
        assert_eq!(limiter.check("10.0.0.1").unwrap().remaining, 0);

        match limiter.check("10.0.0.1") {
            Err(CampusError::RateLimitExceeded { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 15);
            }
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(15), 1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 1);
        assert!(limiter.check("client").is_ok());
        assert!(limiter.check("client").is_err());

        tokio::time::advance(Duration::from_secs(4)).await;
        match limiter.check("client") {
            Err(CampusError::RateLimitExceeded { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 6);
            }
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        let decision = limiter.check("client").unwrap();
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_after, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_windows_are_purged() {
        let limiter = RateLimiter::new(Duration::from_secs(5), 10);
        limiter.check("a").unwrap();
        limiter.check("b").unwrap();
        assert_eq!(limiter.tracked_keys(), 2);

        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.check("c").unwrap();
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_headers() {
        let limiter = RateLimiter::from_config(&RateLimitConfig::default());
        let headers = limiter.check("client").unwrap().headers();
        assert_eq!(headers[0], ("X-RateLimit-Limit", "100".to_string()));
        assert_eq!(headers[1], ("X-RateLimit-Remaining", "99".to_string()));
        assert_eq!(headers[2].0, "X-RateLimit-Reset");
    }

    #[test]
    fn test_reset_header_saturates_on_huge_window() {
        let decision = RateLimitDecision {
            limit: 1,
            remaining: 0,
            reset_after: Duration::MAX,
        };
        let headers = decision.headers();
        assert_eq!(headers[2], ("X-RateLimit-Reset", i64::MAX.to_string()));
    }

    #[test]
    fn test_reset_header_is_a_future_timestamp() {
        let decision = RateLimitDecision {
            limit: 10,
            remaining: 3,
            reset_after: Duration::from_millis(14_500),
        };
        let now = chrono::Utc::now().timestamp();
        let reset_at: i64 = decision.headers()[2].1.parse().unwrap();
        assert!(reset_at >= now + 15 && reset_at <= now + 16);
    }

    #[test]
    fn test_secs_ceil() {
        assert_eq!(secs_ceil(Duration::from_millis(1500)), 2);
        assert_eq!(secs_ceil(Duration::from_secs(3)), 3);
        assert_eq!(secs_ceil(Duration::ZERO), 0);
    }
}
