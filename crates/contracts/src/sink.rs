//! SessionSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for persistence sinks.

use crate::{ContractError, SessionEvent};

/// Persistence sink trait
///
/// All sink implementations must implement this trait. Writes are delivered
/// at least once, so implementations should key stored records by
/// `SessionEvent::event_key`.
#[trait_variant::make(SessionSink: Send)]
pub trait LocalSessionSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one session event
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, event: &SessionEvent) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
