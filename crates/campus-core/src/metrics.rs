//! In-process metrics registry.
//!
//! A single `MetricsRegistry` is created at startup and shared by handle.
//! All values live behind one mutex; each change is also published to the
//! `metrics` facade as a gauge so an installed exporter sees it.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Named `u64` counters with an explicit lifecycle.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    values: Mutex<HashMap<String, u64>>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to `metric`.
    pub fn increment(&self, metric: &str, value: u64) {
        let current = {
            let mut values = self.values.lock();
            let entry = values.entry(metric.to_string()).or_insert(0);
            *entry = entry.saturating_add(value);
            *entry
        };
        publish(metric, current);
        debug!(metric, value, "Metric incremented");
    }

    /// Subtracts `value` from `metric`, never going below zero.
    pub fn decrement(&self, metric: &str, value: u64) {
        let current = {
            let mut values = self.values.lock();
            let entry = values.entry(metric.to_string()).or_insert(0);
            *entry = entry.saturating_sub(value);
            *entry
        };
        publish(metric, current);
        debug!(metric, value, "Metric decremented");
    }

    /// Overwrites `metric` with `value`.
    pub fn set(&self, metric: &str, value: u64) {
        self.values.lock().insert(metric.to_string(), value);
        publish(metric, value);
        debug!(metric, value, "Metric set");
    }

    /// Returns the current value, zero when never recorded.
    #[must_use]
    pub fn get(&self, metric: &str) -> u64 {
        self.values.lock().get(metric).copied().unwrap_or(0)
    }

    /// Returns a copy of every recorded value.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.values.lock().clone()
    }

    /// Clears one metric, or all of them when `metric` is `None`.
    pub fn reset(&self, metric: Option<&str>) {
        let mut values = self.values.lock();
        match metric {
            Some(name) => {
                values.remove(name);
                publish(name, 0);
                debug!(metric = name, "Metric reset");
            }
            None => {
                for name in values.keys() {
                    publish(name, 0);
                }
                values.clear();
                debug!("All metrics reset");
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn publish(metric: &str, value: u64) {
    ::metrics::gauge!(metric.to_string()).set(value as f64);
}
