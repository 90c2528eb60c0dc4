//! # Swing Engine
//!
//! Real-time swing detection over IMU sample batches.
//!
//! Responsibilities:
//! - sliding window of recent samples (`MagnitudeBuffer`)
//! - threshold + minimum-distance peak finding (`PeakDetector`)
//! - per-session lifecycle, duplicate suppression, sequencing (`SessionTracker`)
//! - thread-safe map of live sessions publishing `SessionEvent`s (`SessionRegistry`)
//!
//! Detection is synchronous and CPU-only; nothing here awaits or does I/O.
//!
//! ## Example
//!
//! ```ignore
//! use swing_engine::SessionRegistry;
//!
//! let registry = SessionRegistry::detached(DetectorConfig::default());
//! registry.start("watch_20251108_024942", "AppleWatch")?;
//!
//! for swing in registry.ingest("watch_20251108_024942", &batch)? {
//!     // Handle swing
//! }
//!
//! let summary = registry.end("watch_20251108_024942")?;
//! ```

mod buffer;
mod clock;
mod error;
pub mod experimental;
mod peak;
mod ranges;
mod registry;
mod tracker;

pub use buffer::MagnitudeBuffer;
pub use clock::{session_id_from_start_time, Clock, ManualClock, SystemClock};
pub use error::TrackerError;
pub use peak::{DetectedPeak, PeakDetector};
pub use ranges::ReceivedRanges;
pub use registry::SessionRegistry;
pub use tracker::{IngestOutcome, RawBatch, SessionInfo, SessionTracker};
