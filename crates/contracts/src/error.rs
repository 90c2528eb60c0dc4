//! Errors crossing crate boundaries
//!
//! Only configuration loading and sink writes fail through this type. Session
//! protocol errors live in `swing_engine`, data-quality problems are counted
//! rather than raised.

use thiserror::Error;

/// Shared error type
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration could not be parsed
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration parsed but breaks a rule; `field` is a dotted path
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A sink failed to persist an event
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Field path of a validation error
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ConfigValidation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = ContractError::config_validation("detector.min_separation", "must be >= 1");
        assert_eq!(err.field(), Some("detector.min_separation"));
        assert_eq!(
            err.to_string(),
            "config validation error at 'detector.min_separation': must be >= 1"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: ContractError = std::io::Error::other("disk full").into();
        assert!(matches!(err, ContractError::Io(_)));
        assert_eq!(err.field(), None);
    }
}
