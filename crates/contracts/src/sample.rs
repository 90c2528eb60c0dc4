//! Sample - SampleSource output
//!
//! One IMU reading as produced by the watch motion manager.

use serde::{Deserialize, Serialize};

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Device orientation as a unit quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// One IMU reading
///
/// Immutable once constructed. Detection only looks at `rotation_rate` and
/// `acceleration`; gravity and orientation are carried through to storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Device clock (seconds)
    pub timestamp: f64,

    /// Gyroscope (rad/s)
    pub rotation_rate: Vector3,

    /// User acceleration, gravity removed (g)
    pub acceleration: Vector3,

    /// Gravity vector (g)
    pub gravity: Vector3,

    /// Device orientation
    pub orientation: Quaternion,
}

impl Sample {
    /// Sample with only rotation and acceleration set (gravity zero, identity orientation)
    pub fn new(timestamp: f64, rotation_rate: Vector3, acceleration: Vector3) -> Self {
        Self {
            timestamp,
            rotation_rate,
            acceleration,
            gravity: Vector3::default(),
            orientation: Quaternion::IDENTITY,
        }
    }

    /// Magnitude of the rotation vector (rad/s)
    #[inline]
    pub fn rotation_magnitude(&self) -> f64 {
        self.rotation_rate.magnitude()
    }

    /// Magnitude of the user acceleration vector (g)
    #[inline]
    pub fn acceleration_magnitude(&self) -> f64 {
        self.acceleration.magnitude()
    }

    /// Whether every field used by detection is a finite number
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite() && self.rotation_rate.is_finite() && self.acceleration.is_finite()
    }
}

/// A time-ordered group of samples delivered together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBatch {
    /// Session the batch belongs to
    pub session_id: String,

    /// Samples in delivery order
    pub samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn new(session_id: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            session_id: session_id.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
