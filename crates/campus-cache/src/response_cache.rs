//! Response caching as `tower` middleware.
//!
//! ```ignore
//! let service = ResponseCacheLayer::new(cache, DEFAULT_RESPONSE_TTL)
//!     .with_key("course:list")
//!     .layer(list_courses);
//! ```

use crate::cache_aside::CacheAside;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};

/// TTL applied when a route does not choose its own.
pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(60);

/// Requests that can name their cached response.
pub trait CacheKey {
    fn cache_key(&self) -> String;
}

/// The parts of an HTTP request that identify its response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestFingerprint {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub query: Value,
    #[serde(default)]
    pub body: Value,
}

impl RequestFingerprint {
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

impl CacheKey for RequestFingerprint {
    /// `"<METHOD>:<url>:<params>:<query>:<body>"`, the last three as compact JSON.
    fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.method.to_uppercase(),
            self.url,
            self.params,
            self.query,
            self.body
        )
    }
}

/// Layer that serves repeated requests from the cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheLayer {
    cache: CacheAside,
    ttl: Duration,
    key: Option<Arc<str>>,
}

impl ResponseCacheLayer {
    #[must_use]
    pub fn new(cache: CacheAside, ttl: Duration) -> Self {
        Self { cache, ttl, key: None }
    }

    /// Stores every response of the wrapped service under one fixed key
    /// instead of the request's own key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl<S> Layer<S> for ResponseCacheLayer {
    type Service = ResponseCache<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCache {
            inner,
            cache: self.cache.clone(),
            ttl: self.ttl,
            key: self.key.clone(),
        }
    }
}

/// Service produced by [`ResponseCacheLayer`].
///
/// A cached response is returned without calling the inner service.
/// Otherwise the inner service runs and its successful response is stored;
/// errors and `null` responses pass through and are never cached.
#[derive(Debug, Clone)]
pub struct ResponseCache<S> {
    inner: S,
    cache: CacheAside,
    ttl: Duration,
    key: Option<Arc<str>>,
}

impl<S, Req> Service<Req> for ResponseCache<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Serialize + DeserializeOwned + Send + Sync + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    Req: CacheKey + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = match &self.key {
            Some(key) => key.to_string(),
            None => req.cache_key(),
        };
        // the ready service goes into the future, its clone stays behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let cache = self.cache.clone();
        let ttl = self.ttl;

        Box::pin(async move {
            cache
                .wrap_cacheable(&key, Some(ttl), move || inner.call(req), is_cacheable::<S::Response>)
                .await
        })
    }
}

/// A response that serializes to JSON `null` is neither stored nor served.
fn is_cacheable<T: Serialize>(response: &T) -> bool {
    serde_json::to_value(response).is_ok_and(|value| !value.is_null())
}
