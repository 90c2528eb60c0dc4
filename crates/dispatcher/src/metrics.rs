//! Per-sink counters, read back once the dispatcher has drained

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};

/// Live counters shared between a `SinkHandle` and its worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queued: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events waiting in the worker queue at the last observation
    pub fn observe_queue(&self, len: usize) {
        self.queued.store(len, Relaxed);
    }

    pub fn record_write(&self) {
        self.written.fetch_add(1, Relaxed);
    }

    /// An event was abandoned after its last retry
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Relaxed);
    }

    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Relaxed);
    }

    /// An event never reached the queue
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queued.load(Relaxed),
            write_count: self.written.load(Relaxed),
            failure_count: self.failed.load(Relaxed),
            retry_count: self.retried.load(Relaxed),
            dropped_count: self.dropped.load(Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub retry_count: u64,
    pub dropped_count: u64,
}

impl MetricsSnapshot {
    /// Events the sink did not persist, whether dropped or failed
    pub fn lost(&self) -> u64 {
        self.failure_count + self.dropped_count
    }
}
