//! # Campus Core
//!
//! Core types shared by every Campus crate: the unified error enum and its
//! response body, the result alias, logging initialization and the
//! in-process metrics registry.

pub mod error;
pub mod metrics;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use crate::metrics::MetricsRegistry;
pub use result::*;
