//! CSV replay source
//!
//! Replays a WristMotion CSV export (one row per motion-manager reading) as a
//! sample stream.
//!
//! Expected columns: `time`, `seconds_elapsed`, `rotationRateX..Z`,
//! `gravityX..Z`, `accelerationX..Z`, `quaternionW..Z`. `time` is taken as
//! nanoseconds since the epoch when it exceeds 1e12; otherwise
//! `seconds_elapsed` is the timestamp.

use std::io::Read;
use std::path::{Path, PathBuf};

use contracts::{Quaternion, Sample, SampleBatchCallback, SampleSource, Vector3};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{IngestionError, Result};
use crate::playback::{Playback, PlaybackConfig};

/// `time` values above this are nanosecond epoch timestamps
const NANOSECOND_TIME_THRESHOLD: f64 = 1e12;

#[derive(Debug, Deserialize)]
struct WristMotionRow {
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    seconds_elapsed: Option<f64>,

    #[serde(rename = "rotationRateX")]
    rotation_rate_x: f64,
    #[serde(rename = "rotationRateY")]
    rotation_rate_y: f64,
    #[serde(rename = "rotationRateZ")]
    rotation_rate_z: f64,

    #[serde(rename = "gravityX", default)]
    gravity_x: f64,
    #[serde(rename = "gravityY", default)]
    gravity_y: f64,
    #[serde(rename = "gravityZ", default)]
    gravity_z: f64,

    #[serde(rename = "accelerationX")]
    acceleration_x: f64,
    #[serde(rename = "accelerationY")]
    acceleration_y: f64,
    #[serde(rename = "accelerationZ")]
    acceleration_z: f64,

    #[serde(rename = "quaternionW", default = "identity_w")]
    quaternion_w: f64,
    #[serde(rename = "quaternionX", default)]
    quaternion_x: f64,
    #[serde(rename = "quaternionY", default)]
    quaternion_y: f64,
    #[serde(rename = "quaternionZ", default)]
    quaternion_z: f64,
}

fn identity_w() -> f64 {
    1.0
}

impl WristMotionRow {
    fn timestamp(&self) -> Option<f64> {
        match (self.time, self.seconds_elapsed) {
            (Some(time), _) if time > NANOSECOND_TIME_THRESHOLD => Some(time / 1e9),
            (_, Some(elapsed)) => Some(elapsed),
            _ => None,
        }
    }

    fn into_sample(self) -> Option<Sample> {
        Some(Sample {
            timestamp: self.timestamp()?,
            rotation_rate: Vector3::new(
                self.rotation_rate_x,
                self.rotation_rate_y,
                self.rotation_rate_z,
            ),
            acceleration: Vector3::new(
                self.acceleration_x,
                self.acceleration_y,
                self.acceleration_z,
            ),
            gravity: Vector3::new(self.gravity_x, self.gravity_y, self.gravity_z),
            orientation: Quaternion {
                w: self.quaternion_w,
                x: self.quaternion_x,
                y: self.quaternion_y,
                z: self.quaternion_z,
            },
        })
    }
}

/// Parse WristMotion CSV rows into samples, in file order
///
/// Rows without any usable timestamp are skipped. `path` is only used in
/// error messages.
pub fn parse_wristmotion<R: Read>(reader: R, path: &Path) -> Result<Vec<Sample>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for row in csv_reader.deserialize::<WristMotionRow>() {
        let row = row.map_err(|e| IngestionError::csv(path, e))?;
        match row.into_sample() {
            Some(sample) => samples.push(sample),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "Rows without timestamp skipped");
    }
    Ok(samples)
}

/// Replays a recorded CSV through the `SampleSource` interface
pub struct CsvReplaySource {
    path: PathBuf,
    playback: Playback,
}

impl CsvReplaySource {
    /// Load every sample of `path` up front
    pub fn load(
        path: impl AsRef<Path>,
        source_id: impl Into<String>,
        session_id: impl Into<String>,
        config: PlaybackConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path).map_err(|e| IngestionError::io(&path, e))?;
        let samples = parse_wristmotion(std::io::BufReader::new(file), &path)?;
        if samples.is_empty() {
            return Err(IngestionError::Empty { path });
        }

        let duration = samples.last().map(|s| s.timestamp).unwrap_or(0.0)
            - samples.first().map(|s| s.timestamp).unwrap_or(0.0);
        info!(
            path = %path.display(),
            samples = samples.len(),
            duration_s = duration,
            "Loaded WristMotion CSV"
        );

        Ok(Self {
            playback: Playback::new(source_id.into(), session_id.into(), samples, config),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples(&self) -> &[Sample] {
        self.playback.samples()
    }

    /// Device-clock span of the recording (seconds)
    pub fn duration_s(&self) -> f64 {
        match (self.samples().first(), self.samples().last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

impl SampleSource for CsvReplaySource {
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
