//! Mock sample source
//!
//! Generates a synthetic wrist-motion stream: a quiet baseline with uniform
//! noise and a Gaussian rotation burst at every scheduled swing. Used for
//! development and tests without a watch.

use std::f64::consts::PI;

use contracts::{Quaternion, Sample, SampleBatchCallback, SampleSource, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::playback::{Playback, PlaybackConfig};

/// Mock stream configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MockSourceConfig {
    /// Nominal sampling rate (Hz)
    pub sample_rate_hz: f64,
    /// Stream length (seconds)
    pub duration_s: f64,
    /// Device timestamp of the first sample
    pub start_timestamp: f64,
    /// Time of the first swing relative to the stream start (seconds)
    pub first_swing_s: f64,
    /// Spacing between swings (seconds)
    pub swing_interval_s: f64,
    /// Peak rotation rate of a swing (rad/s)
    pub swing_peak_rad_s: f64,
    /// Standard deviation of the swing burst (seconds)
    pub swing_width_s: f64,
    /// Rotation rate between swings (rad/s)
    pub baseline_rad_s: f64,
    /// Half-width of the uniform noise added to the rotation rate (rad/s)
    pub noise_rad_s: f64,
    /// Noise generator seed
    pub seed: u64,
    pub playback: PlaybackConfig,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100.0,
            duration_s: 30.0,
            start_timestamp: 0.0,
            first_swing_s: 1.5,
            swing_interval_s: 3.0,
            swing_peak_rad_s: 6.0,
            swing_width_s: 0.08,
            baseline_rad_s: 0.3,
            noise_rad_s: 0.05,
            seed: 7,
            playback: PlaybackConfig::default(),
        }
    }
}

impl MockSourceConfig {
    /// Swing centre times (device clock) that fit fully inside the stream
    pub fn swing_times(&self) -> Vec<f64> {
        if self.swing_interval_s <= 0.0 {
            return Vec::new();
        }
        let margin = 4.0 * self.swing_width_s;
        let mut times = Vec::new();
        let mut offset = self.first_swing_s;
        while offset + margin < self.duration_s {
            if offset - margin > 0.0 {
                times.push(self.start_timestamp + offset);
            }
            offset += self.swing_interval_s;
        }
        times
    }

    pub fn sample_count(&self) -> usize {
        (self.duration_s * self.sample_rate_hz).round().max(0.0) as usize
    }

    /// Generate the full sample sequence
    pub fn generate(&self) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let swings = self.swing_times();
        let axis = swing_axis();
        let two_sigma_sq = 2.0 * self.swing_width_s.powi(2);

        (0..self.sample_count())
            .map(|i| {
                let timestamp = self.start_timestamp + i as f64 / self.sample_rate_hz;

                let burst: f64 = swings
                    .iter()
                    .map(|&centre| (-(timestamp - centre).powi(2) / two_sigma_sq).exp())
                    .sum();
                let noise = if self.noise_rad_s > 0.0 {
                    rng.random_range(-self.noise_rad_s..self.noise_rad_s)
                } else {
                    0.0
                };
                let rotation = (self.baseline_rad_s + burst * self.swing_peak_rad_s + noise).max(0.0);

                // Forearm pronation while swinging, a slow wobble otherwise
                let angle = 0.25 * PI * burst.min(1.0);
                let half = angle / 2.0;

                Sample {
                    timestamp,
                    rotation_rate: Vector3::new(axis.x * rotation, axis.y * rotation, axis.z * rotation),
                    acceleration: Vector3::new(0.05 + 2.5 * burst, 0.02, 0.4 * burst),
                    gravity: Vector3::new(0.0, -angle.sin(), -angle.cos()),
                    orientation: Quaternion {
                        w: half.cos(),
                        x: half.sin(),
                        y: 0.0,
                        z: 0.0,
                    },
                }
            })
            .collect()
    }
}

/// Unit rotation axis of a forehand
fn swing_axis() -> Vector3 {
    let raw = Vector3::new(0.3, 0.9, 0.3);
    let norm = raw.magnitude();
    Vector3::new(raw.x / norm, raw.y / norm, raw.z / norm)
}

/// Mock sample source
///
/// Implements `SampleSource`; the stream is generated up front and delivered
/// from a background thread.
pub struct MockSampleSource {
    config: MockSourceConfig,
    playback: Playback,
}

impl MockSampleSource {
    pub fn new(
        source_id: impl Into<String>,
        session_id: impl Into<String>,
        config: MockSourceConfig,
    ) -> Self {
        let samples = config.generate();
        let playback = Playback::new(
            source_id.into(),
            session_id.into(),
            samples,
            config.playback.clone(),
        );
        Self { config, playback }
    }

    pub fn with_defaults(source_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new(source_id, session_id, MockSourceConfig::default())
    }

    pub fn config(&self) -> &MockSourceConfig {
        &self.config
    }

    /// Number of swings planted in the stream
    pub fn expected_swings(&self) -> usize {
        self.config.swing_times().len()
    }

    pub fn samples(&self) -> &[Sample] {
        self.playback.samples()
    }
}

impl SampleSource for MockSampleSource {
    fn source_id(&self) -> &str {
        self.playback.source_id()
    }

    fn session_id(&self) -> &str {
        self.playback.session_id()
    }

    fn listen(&self, callback: SampleBatchCallback) {
        self.playback.listen(callback);
    }

    fn stop(&self) {
        self.playback.stop();
    }

    fn is_listening(&self) -> bool {
        self.playback.is_listening()
    }
}
