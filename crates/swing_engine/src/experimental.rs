//! Experimental swing-speed estimate.
//!
//! Not part of `Swing` and not used by detection. The lever model treats the
//! forearm and racket as one rigid arm rotating at the peak rate.

/// Forearm length plus racket length (metres)
pub const LEVER_ARM_M: f64 = 0.6 + 0.7;

const MPS_TO_MPH: f64 = 2.237;

/// Estimated racket-head speed in mph for a peak rotation rate (rad/s)
pub fn estimate_speed_mph(rotation_magnitude: f64) -> f64 {
    rotation_magnitude * LEVER_ARM_M * MPS_TO_MPH
}
