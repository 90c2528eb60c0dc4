//! Dispatcher - main loop for fan-out to sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SessionEvent, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::{RetryPolicy, SinkHandle};
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{FileSink, LogSink};

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let retry = RetryPolicy::from_config(config);
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity, retry))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity, retry))
        }
    }
}

/// Fans session events out to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<SessionEvent>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Run until the input channel closes, then drain and close every sink
    ///
    /// Returns each sink's final metrics.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut event_count: u64 = 0;

        while let Some(event) = self.input_rx.recv().await {
            event_count += 1;
            self.dispatch_event(&event);

            if event_count.is_multiple_of(100) {
                debug!(events = event_count, "Dispatcher progress");
            }
        }

        info!(events = event_count, "Dispatcher input closed, shutting down");

        let metrics: Vec<(String, Arc<SinkMetrics>)> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();

        Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");

        metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch_event(&self, event: &SessionEvent) {
        for handle in &self.handles {
            handle.try_send(event.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Build one worker per configured sink, in config order
///
/// Workers already spawned are shut down if a later sink cannot be built.
#[instrument(name = "dispatcher_create", skip_all, fields(sinks = sink_configs.len()))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<SessionEvent>,
) -> Result<Dispatcher, DispatcherError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in &sink_configs {
        match create_sink_handle(config) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                Dispatcher::shutdown_handles(handles).await;
                return Err(e);
            }
        }
    }
    Ok(Dispatcher::with_handles(handles, input_rx))
}
