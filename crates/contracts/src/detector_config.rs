//! Detector configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Swing detector configuration
///
/// Set once per session. Defaults reproduce 3 s windows, a 2.0 rad/s height
/// threshold and 0.5 s peak spacing at a nominal 100 Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DetectorConfig {
    /// Sliding window size (samples)
    #[serde(default = "default_window_capacity")]
    #[validate(range(min = 3, message = "window_capacity must be >= 3"))]
    pub window_capacity: usize,

    /// Minimum rotation magnitude for a peak (rad/s)
    #[serde(default = "default_height_threshold")]
    #[validate(range(min = 0.0, message = "height_threshold must be >= 0"))]
    pub height_threshold: f64,

    /// Minimum spacing between accepted peaks (samples)
    #[serde(default = "default_min_separation")]
    #[validate(range(min = 1, message = "min_separation must be >= 1"))]
    pub min_separation: usize,

    /// Nominal sensor rate (Hz), converts sample counts to seconds
    #[serde(default = "default_nominal_rate_hz")]
    #[validate(range(exclusive_min = 0.0, message = "nominal_rate_hz must be > 0"))]
    pub nominal_rate_hz: f64,

    /// Publish accepted samples as raw buffers
    #[serde(default = "default_retain_raw_samples")]
    pub retain_raw_samples: bool,
}

fn default_window_capacity() -> usize {
    300
}

fn default_height_threshold() -> f64 {
    2.0
}

fn default_min_separation() -> usize {
    50
}

fn default_nominal_rate_hz() -> f64 {
    100.0
}

fn default_retain_raw_samples() -> bool {
    true
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            height_threshold: default_height_threshold(),
            min_separation: default_min_separation(),
            nominal_rate_hz: default_nominal_rate_hz(),
            retain_raw_samples: default_retain_raw_samples(),
        }
    }
}

impl DetectorConfig {
    /// Minimum time between two emitted swings (seconds)
    pub fn min_interval_s(&self) -> f64 {
        self.min_separation as f64 / self.nominal_rate_hz
    }

    /// Window span at the nominal rate (seconds)
    pub fn window_span_s(&self) -> f64 {
        self.window_capacity as f64 / self.nominal_rate_hz
    }
}
