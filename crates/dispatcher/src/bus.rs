//! EventBus - non-blocking bridge from the detection path to the dispatcher

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{error, warn};

use contracts::{EventPublisher, SessionEvent};

/// Bounded publisher feeding a `Dispatcher`
///
/// `publish` never blocks or awaits, so it is safe to call from synchronous
/// detection code while a session lock is held.
#[derive(Debug)]
pub struct EventBus {
    tx: mpsc::Sender<SessionEvent>,
    dropped: AtomicU64,
}

impl EventBus {
    /// Create a bus and the receiver the dispatcher consumes
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Events rejected because the queue was full or closed
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events currently waiting for the dispatcher
    pub fn queue_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: SessionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    session_id = %event.session_id(),
                    event_key = %event.event_key(),
                    "Event bus full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                error!(
                    session_id = %event.session_id(),
                    "Dispatcher gone, event dropped"
                );
                false
            }
        }
    }
}
