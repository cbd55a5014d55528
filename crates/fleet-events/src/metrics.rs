//! Lock-free counters for the event bus.
//!
//! All counters use [`AtomicU64`] with [`Ordering::Relaxed`]: they are
//! monotonic and have no causal dependency on each other.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

const ORD: Ordering = Ordering::Relaxed;

#[derive(Debug, Default)]
pub struct BusMetrics {
    published: AtomicU64,
    dropped: AtomicU64,
    lag_events: AtomicU64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_publish(&self) {
        self.published.fetch_add(1, ORD);
    }

    /// Record `n` events evicted from a lagging subscriber's buffer under
    /// the drop-oldest policy.
    #[inline]
    pub(crate) fn record_lag(&self, missed: u64) {
        self.dropped.fetch_add(missed, ORD);
        self.lag_events.fetch_add(1, ORD);
    }

    pub fn published(&self) -> u64 {
        self.published.load(ORD)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(ORD)
    }

    pub fn lag_events(&self) -> u64 {
        self.lag_events.load(ORD)
    }

    pub fn snapshot(&self) -> BusMetricsSnapshot {
        BusMetricsSnapshot {
            published: self.published(),
            dropped: self.dropped(),
            lag_events: self.lag_events(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMetricsSnapshot {
    pub published: u64,
    pub dropped: u64,
    pub lag_events: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = BusMetrics::new();
        let s = m.snapshot();
        assert_eq!(s.published, 0);
        assert_eq!(s.dropped, 0);
        assert_eq!(s.lag_events, 0);
    }

    #[test]
    fn records_publish_and_lag() {
        let m = BusMetrics::new();
        m.record_publish();
        m.record_publish();
        m.record_lag(3);
        let s = m.snapshot();
        assert_eq!(s.published, 2);
        assert_eq!(s.dropped, 3);
        assert_eq!(s.lag_events, 1);
    }
}
