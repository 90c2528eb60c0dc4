//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Sample timestamps are device-clock seconds (f64), non-decreasing per session
//! - Session start/end times are wall-clock `DateTime<Utc>` supplied by an injected clock

mod blueprint;
mod detector_config;
mod error;
mod event;
mod sample;
mod sample_source;
mod session;
mod sink;

pub use blueprint::*;
pub use detector_config::DetectorConfig;
pub use error::*;
pub use event::{raw_range_label, EventPublisher, NullPublisher, SessionEvent};
pub use sample::*;
pub use sample_source::{SampleBatchCallback, SampleSource};
pub use session::*;
pub use sink::*;
