//! Cumulative pool activity counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters updated by the worker threads.
///
/// Counters are monotonic over the pool's lifetime; read them with
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct PoolMetrics {
    steps: AtomicU64,
    resets: AtomicU64,
    failures: AtomicU64,
}

/// A point-in-time copy of the pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Non-reset steps completed successfully.
    pub steps: u64,
    /// Reset steps completed successfully.
    pub resets: u64,
    /// Steps that failed (and closed the pool).
    pub failures: u64,
}

impl PoolMetrics {
    pub(crate) fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            steps: self.steps.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = PoolMetrics::default();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());

        metrics.record_step();
        metrics.record_step();
        metrics.record_reset();
        metrics.record_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.steps, 2);
        assert_eq!(snap.resets, 1);
        assert_eq!(snap.failures, 1);
    }
}
