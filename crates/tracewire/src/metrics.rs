//! Process-wide counters describing request-handler activity.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

static METRICS: Lazy<RequestMetrics> = Lazy::new(RequestMetrics::default);

/// Counters for traced requests. All updates are relaxed; readers get a
/// point-in-time [`MetricsSnapshot`].
#[derive(Debug, Default)]
pub struct RequestMetrics {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    sampled_out: AtomicU64,
}

/// Point-in-time copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub sampled_out: u64,
}

impl RequestMetrics {
    pub(crate) fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sampled_out(&self) {
        self.sampled_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            sampled_out: self.sampled_out.load(Ordering::Relaxed),
        }
    }
}

/// The process-wide request metrics.
pub fn request_metrics() -> &'static RequestMetrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let before = request_metrics().snapshot();
        request_metrics().record_started();
        request_metrics().record_failed();
        let after = request_metrics().snapshot();

        assert!(after.started >= before.started + 1);
        assert!(after.failed >= before.failed + 1);
    }
}
