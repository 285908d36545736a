//! Internal metrics collection.
//!
//! Counters accumulate in-memory; the worker scheduler logs a snapshot
//! periodically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Collected metrics for the consultation core.
#[derive(Debug, Default)]
pub struct Metrics {
    // Call signaling metrics
    pub calls_created: Counter,
    pub calls_accepted: Counter,
    pub calls_rejected: Counter,
    pub calls_missed: Counter,
    pub calls_ended: Counter,
    pub calls_cancelled: Counter,
    pub transition_conflicts: Counter,

    // Trial metrics
    pub trials_started: Counter,
    pub trials_expired: Counter,
    pub trials_converted: Counter,
    pub messages_allowed: Counter,
    pub messages_blocked: Counter,

    // Store metrics
    pub store_errors: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            calls_created: self.calls_created.get(),
            calls_accepted: self.calls_accepted.get(),
            calls_rejected: self.calls_rejected.get(),
            calls_missed: self.calls_missed.get(),
            calls_ended: self.calls_ended.get(),
            calls_cancelled: self.calls_cancelled.get(),
            transition_conflicts: self.transition_conflicts.get(),
            trials_started: self.trials_started.get(),
            trials_expired: self.trials_expired.get(),
            trials_converted: self.trials_converted.get(),
            messages_allowed: self.messages_allowed.get(),
            messages_blocked: self.messages_blocked.get(),
            store_errors: self.store_errors.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub calls_created: u64,
    pub calls_accepted: u64,
    pub calls_rejected: u64,
    pub calls_missed: u64,
    pub calls_ended: u64,
    pub calls_cancelled: u64,
    pub transition_conflicts: u64,
    pub trials_started: u64,
    pub trials_expired: u64,
    pub trials_converted: u64,
    pub messages_allowed: u64,
    pub messages_blocked: u64,
    pub store_errors: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
