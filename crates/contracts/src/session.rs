//! Session records - SessionTracker output
//!
//! Detected swings, per-session diagnostics and the finalized summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not tracked
    Idle,
    /// Accepting batches
    Recording,
    /// Terminal, data flushed
    Ended,
}

/// A detected swing event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    /// Owning session (non-owning back-reference)
    pub session_id: String,

    /// 1-based ordinal within the session
    pub sequence_number: u32,

    /// Timestamp of the peak sample
    pub timestamp: f64,

    /// Rotation magnitude at the peak (rad/s)
    pub rotation_magnitude: f64,

    /// Acceleration magnitude at the peak (g)
    pub acceleration_magnitude: f64,

    /// Full sensor reading at the peak
    pub peak_sample: Sample,
}

impl Swing {
    /// Stable identifier, e.g. `watch_20251108_024942_swing_007`
    pub fn swing_id(&self) -> String {
        format!("{}_swing_{:03}", self.session_id, self.sequence_number)
    }
}

/// Data-quality and delivery counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    /// Batches discarded because their range was already received
    pub duplicate_batches: u64,

    /// Samples contained in discarded duplicate batches
    pub duplicate_samples: u64,

    /// Samples dropped for NaN/infinite values
    pub non_finite_samples: u64,

    /// Samples dropped for going backwards in time
    pub out_of_order_samples: u64,

    /// Batches with no usable samples
    pub empty_batches: u64,
}

impl SessionDiagnostics {
    /// Total samples skipped for data-quality reasons
    pub fn skipped_samples(&self) -> u64 {
        self.non_finite_samples + self.out_of_order_samples
    }
}

/// Finalized session statistics returned by `end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub device: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_samples_ingested: u64,
    pub total_swings_detected: u64,

    /// Wall-clock seconds between start and end
    pub elapsed_seconds: f64,

    /// `total_samples_ingested / elapsed_seconds`, 0 when nothing elapsed
    pub effective_sample_rate_hz: f64,

    /// Device timestamp of the first accepted sample
    pub first_sample_timestamp: Option<f64>,

    /// Device timestamp of the last accepted sample
    pub last_sample_timestamp: Option<f64>,

    pub diagnostics: SessionDiagnostics,
}

impl SessionSummary {
    /// Duration in whole minutes, as stored in the sessions table
    pub fn duration_minutes(&self) -> i64 {
        (self.elapsed_seconds / 60.0).floor() as i64
    }
}

/// Everything computed when a session ends
///
/// Kept by the caller so a failed flush can be re-published without
/// re-running detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedSession {
    pub summary: SessionSummary,
    pub swings: Vec<Swing>,
}

/// Live detector statistics for a recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub session_id: String,
    pub state: SessionState,
    pub total_samples_ingested: u64,
    pub total_swings_detected: u64,
    pub window_len: usize,
    pub window_capacity: usize,
    pub elapsed_seconds: f64,
    pub sample_rate_hz: f64,
    pub height_threshold: f64,
    pub min_separation: usize,
    pub diagnostics: SessionDiagnostics,
}
