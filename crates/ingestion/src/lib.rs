//! # Ingestion
//!
//! Sample sources feeding the swing tracker.
//!
//! Responsibilities:
//! - produce `SampleBatch`es through the `SampleSource` interface
//! - synthetic swing streams for development (`MockSampleSource`)
//! - replay of recorded WristMotion CSV exports (`CsvReplaySource`)
//! - optional pacing and duplicate re-delivery, shared by every source
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{batch_channel, MockSampleSource};
//!
//! let source = MockSampleSource::with_defaults("mock", "watch_20251108_024942");
//! let mut rx = batch_channel(&source, 16);
//! while let Some(batch) = rx.recv().await {
//!     registry.ingest_batch(&batch)?;
//! }
//! ```

mod error;
mod mock;
mod playback;
mod replay;

pub use contracts::{SampleBatch, SampleSource};
pub use error::{IngestionError, Result};
pub use mock::{MockSampleSource, MockSourceConfig};
pub use playback::{batch_channel, Pacing, PlaybackConfig};
pub use replay::{parse_wristmotion, CsvReplaySource};
