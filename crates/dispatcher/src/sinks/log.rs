//! LogSink - logs event summaries via tracing

use contracts::{ContractError, SessionEvent, SessionSink};
use tracing::{info, instrument};

/// Sink that logs event summaries
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_event_summary(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Started {
                session_id,
                device,
                start_time,
            } => info!(
                sink = %self.name,
                session_id = %session_id,
                device = %device,
                start_time = %start_time,
                "Session started"
            ),
            SessionEvent::RawBuffer {
                session_id,
                start_timestamp,
                end_timestamp,
                samples,
            } => info!(
                sink = %self.name,
                session_id = %session_id,
                start = start_timestamp,
                end = end_timestamp,
                samples = samples.len(),
                "Raw samples received"
            ),
            SessionEvent::SwingDetected(swing) => info!(
                sink = %self.name,
                swing_id = %swing.swing_id(),
                timestamp = swing.timestamp,
                rotation = swing.rotation_magnitude,
                acceleration = swing.acceleration_magnitude,
                "Swing detected"
            ),
            SessionEvent::Finished(finished) => info!(
                sink = %self.name,
                session_id = %finished.summary.session_id,
                swings = finished.summary.total_swings_detected,
                samples = finished.summary.total_samples_ingested,
                elapsed_s = finished.summary.elapsed_seconds,
                "Session finished"
            ),
        }
    }
}

impl SessionSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind())
    )]
    async fn write(&mut self, event: &SessionEvent) -> Result<(), ContractError> {
        self.log_event_summary(event);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
