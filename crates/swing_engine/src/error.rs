//! Tracker error types

use thiserror::Error;

/// Session protocol errors
///
/// Both variants are caller mistakes; the tracker never retries them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// `start` for a session that is still live
    #[error("session '{session_id}' is already recording")]
    DuplicateSession { session_id: String },

    /// `ingest`/`end` for a session that is not recording
    #[error("session '{session_id}' is not recording")]
    UnknownSession { session_id: String },
}

impl TrackerError {
    pub fn duplicate_session(session_id: impl Into<String>) -> Self {
        Self::DuplicateSession {
            session_id: session_id.into(),
        }
    }

    pub fn unknown_session(session_id: impl Into<String>) -> Self {
        Self::UnknownSession {
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::DuplicateSession { session_id } | Self::UnknownSession { session_id } => {
                session_id
            }
        }
    }

    /// Whether the error is a caller protocol violation
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSession { .. } | Self::UnknownSession { .. }
        )
    }
}
