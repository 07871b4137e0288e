//! Server counters. Local observability only, never sent to peers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub received: AtomicU64,
    pub dropped_malformed: AtomicU64,
    pub dropped_untrusted: AtomicU64,
    pub dropped_no_source: AtomicU64,
    pub resolved: AtomicU64,
    pub rejected: AtomicU64,
    pub delivery_failures: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_untrusted: self.dropped_untrusted.load(Ordering::Relaxed),
            dropped_no_source: self.dropped_no_source.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub dropped_malformed: u64,
    pub dropped_untrusted: u64,
    pub dropped_no_source: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub delivery_failures: u64,
}

impl MetricsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.dropped_malformed + self.dropped_untrusted + self.dropped_no_source
    }

    /// Responses produced, delivered or not
    pub fn answered(&self) -> u64 {
        self.resolved + self.rejected
    }
}
