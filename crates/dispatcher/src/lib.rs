//! # Dispatcher
//!
//! Persistence side of the swing tracker.
//!
//! Responsibilities:
//! - accept `SessionEvent`s from the detection path without blocking (`EventBus`)
//! - fan out to every configured sink
//! - isolate slow or failing sinks behind their own queue and retrying worker

pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use bus::EventBus;
pub use contracts::{SessionEvent, SessionSink};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::{RetryPolicy, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
