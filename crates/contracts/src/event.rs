//! SessionEvent - SessionTracker output towards persistence
//!
//! Events are published through `EventPublisher`, which must never block the
//! ingestion path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FinishedSession, Sample, Swing};

/// Persistence-bound event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Session registered as live
    Started {
        session_id: String,
        device: String,
        start_time: DateTime<Utc>,
    },

    /// Accepted samples of one batch, retained verbatim
    RawBuffer {
        session_id: String,
        start_timestamp: f64,
        end_timestamp: f64,
        samples: Vec<Sample>,
    },

    /// Newly emitted swing
    SwingDetected(Swing),

    /// Session finalized
    Finished(FinishedSession),
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Started { session_id, .. } | Self::RawBuffer { session_id, .. } => session_id,
            Self::SwingDetected(swing) => &swing.session_id,
            Self::Finished(finished) => &finished.summary.session_id,
        }
    }

    /// Short event kind label (for logs/metrics)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::RawBuffer { .. } => "raw_buffer",
            Self::SwingDetected(_) => "swing_detected",
            Self::Finished(_) => "finished",
        }
    }

    /// Idempotency key: writing two events with the same key stores the same record
    pub fn event_key(&self) -> String {
        match self {
            Self::Started { session_id, .. } => format!("{session_id}/started"),
            Self::RawBuffer {
                session_id,
                start_timestamp,
                end_timestamp,
                ..
            } => format!(
                "{session_id}/raw/{}",
                raw_range_label(*start_timestamp, *end_timestamp)
            ),
            Self::SwingDetected(swing) => format!("{}/swing/{}", swing.session_id, swing.sequence_number),
            Self::Finished(finished) => format!("{}/finished", finished.summary.session_id),
        }
    }
}

/// Label naming a raw buffer by its timestamp range
///
/// Uses the shortest exact representation of each bound, so distinct ranges
/// never share a label.
pub fn raw_range_label(start_timestamp: f64, end_timestamp: f64) -> String {
    format!("{start_timestamp}_{end_timestamp}")
}

/// Non-blocking hand-off of session events to persistence
///
/// Returns `false` when the event could not be queued (dropped).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: SessionEvent) -> bool;
}

/// Publisher that discards everything (detection-only use)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: SessionEvent) -> bool {
        true
    }
}
