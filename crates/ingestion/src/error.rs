//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Replay file could not be opened or read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV row or header
    #[error("failed to parse {}: {source}", path.display())]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Replay file holds no usable samples
    #[error("{} contains no samples", path.display())]
    Empty { path: PathBuf },
}

impl IngestionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::CsvParse {
            path: path.into(),
            source,
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
