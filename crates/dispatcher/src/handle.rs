//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{SessionEvent, SessionSink, SinkConfig};

use crate::metrics::SinkMetrics;

/// How a worker retries a failed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * backoff`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const NONE: Self = Self {
        max_retries: 0,
        backoff: Duration::ZERO,
    };

    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send events to worker
    tx: mpsc::Sender<SessionEvent>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: SessionSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        retry: RetryPolicy,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name, retry).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Send an event to the sink (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full (event dropped)
    pub fn try_send(&self, event: SessionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics
                    .observe_queue(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.metrics.record_drop();
                warn!(
                    sink = %self.name,
                    event_key = %event.event_key(),
                    "Queue full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the sink worker after it drains its queue
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes events and writes them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics, retry),
    fields(sink = %name)
)]
async fn sink_worker<S: SessionSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<SessionEvent>,
    metrics: Arc<SinkMetrics>,
    name: String,
    retry: RetryPolicy,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(event) = rx.recv().await {
        metrics.observe_queue(rx.len());

        let written = write_with_retry(&mut sink, &event, &metrics, &name, retry).await;
        observability::record_sink_write(&name, written);
        if written {
            metrics.record_write();
        } else {
            metrics.record_failure();
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

async fn write_with_retry<S: SessionSink>(
    sink: &mut S,
    event: &SessionEvent,
    metrics: &SinkMetrics,
    name: &str,
    retry: RetryPolicy,
) -> bool {
    let mut attempt: u32 = 0;
    loop {
        match sink.write(event).await {
            Ok(()) => return true,
            Err(e) if attempt < retry.max_retries => {
                attempt += 1;
                metrics.record_retry();
                warn!(
                    sink = %name,
                    event_key = %event.event_key(),
                    attempt,
                    error = %e,
                    "Write failed, retrying"
                );
                tokio::time::sleep(retry.delay(attempt)).await;
            }
            Err(e) => {
                error!(
                    sink = %name,
                    event_key = %event.event_key(),
                    attempts = attempt + 1,
                    error = %e,
                    "Write failed, giving up"
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use contracts::ContractError;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use tokio::time::sleep;

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        /// Fail this many writes before succeeding
        failures_left: Arc<AtomicU32>,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str, write_count: &Arc<AtomicU64>) -> Self {
            Self {
                name: name.to_string(),
                write_count: Arc::clone(write_count),
                failures_left: Arc::new(AtomicU32::new(0)),
                delay_ms: 0,
            }
        }
    }

    impl SessionSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _event: &SessionEvent) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            let failing = self
                .failures_left
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn started(i: usize) -> SessionEvent {
        SessionEvent::Started {
            session_id: format!("s{i}"),
            device: "AppleWatch".to_string(),
            start_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let write_count = Arc::new(AtomicU64::new(0));
        let handle = SinkHandle::spawn(MockSink::new("test", &write_count), 10, RetryPolicy::NONE);

        for i in 0..5 {
            assert!(handle.try_send(started(i)));
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.snapshot().write_count, 5);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let write_count = Arc::new(AtomicU64::new(0));
        let mut sink = MockSink::new("slow", &write_count);
        sink.delay_ms = 100;

        let handle = SinkHandle::spawn(sink, 2, RetryPolicy::NONE);
        for i in 0..10 {
            handle.try_send(started(i));
        }

        assert!(handle.metrics().snapshot().dropped_count > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink::new("flaky", &write_count);
        sink.failures_left.store(2, Ordering::Relaxed);

        let handle = SinkHandle::spawn(sink, 10, fast_retry(3));
        assert!(handle.try_send(started(0)));

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.snapshot().retry_count, 2);
        assert_eq!(metrics.snapshot().failure_count, 0);
    }

    #[tokio::test]
    async fn test_persistent_failure_is_isolated() {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink::new("failing", &write_count);
        sink.failures_left.store(u32::MAX, Ordering::Relaxed);

        let handle = SinkHandle::spawn(sink, 10, fast_retry(2));
        for i in 0..3 {
            handle.try_send(started(i));
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(metrics.snapshot().failure_count, 3);
        assert_eq!(metrics.snapshot().retry_count, 6);
        assert_eq!(write_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = SinkConfig::log("log");
        config.max_retries = 5;
        config.retry_backoff_ms = 20;

        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay(3), Duration::from_millis(60));
    }
}
