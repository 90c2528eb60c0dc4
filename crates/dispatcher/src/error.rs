use thiserror::Error;

/// Failures while wiring sinks; write failures stay inside each sink worker
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("cannot build sink '{name}': {message}")]
    SinkCreation { name: String, message: String },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
