//! TrackerBlueprint - Config Loader output
//!
//! Describes the complete service configuration: detector tuning, pipeline
//! sizing and persistence routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::DetectorConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Detector tuning
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Pipeline sizing
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Pipeline sizing and defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Capacity of the tracker -> dispatcher event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Samples per batch produced by sources
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Device name recorded for sessions
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_event_queue_capacity() -> usize {
    1024
}

fn default_batch_size() -> usize {
    100
}

fn default_device() -> String {
    "AppleWatch".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_event_queue_capacity(),
            batch_size: default_batch_size(),
            device: default_device(),
        }
    }
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Write attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

impl SinkConfig {
    /// Log sink with default queue settings
    pub fn log(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Log,
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            params: HashMap::new(),
        }
    }

    /// File sink rooted at `base_path`
    pub fn file(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            sink_type: SinkType::File,
            params: HashMap::from([("base_path".to_string(), base_path.into())]),
            ..Self::log(name)
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// Per-session JSON files
    File,
}
