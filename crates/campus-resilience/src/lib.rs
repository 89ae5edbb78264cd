//! # Campus Resilience
//!
//! Resilience patterns for the Campus API.
//! Provides a keyed fixed-window rate limiter and an exponential-backoff
//! retry policy.

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::*;
pub use retry::*;
