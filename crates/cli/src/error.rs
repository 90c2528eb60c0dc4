//! Typed failures surfaced by commands before `anyhow` takes over

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Parse or validation failure, with the field path when there is one
    #[error(transparent)]
    Config(#[from] contracts::ContractError),

    /// Sample source could not be prepared
    #[error("Failed to prepare sample source: {0}")]
    Source(#[from] ingestion::IngestionError),

    /// Session protocol violation
    #[error("Session error: {0}")]
    Session(#[from] swing_engine::TrackerError),

    /// Sinks could not be created
    #[error("Failed to set up dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// Invalid combination of run options
    #[error("Invalid run options: {message}")]
    InvalidOptions { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
