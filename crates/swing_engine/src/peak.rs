//! Peak detection over the rotation-magnitude signal of a window.
//!
//! Candidates are interior local maxima at or above the height threshold.
//! A run of adjacent, equal-valued candidates (a plateau) is represented by
//! its earliest index. Candidates are then accepted greedily from the
//! highest magnitude down, rejecting any that fall within `min_separation`
//! samples of an already accepted one.

use contracts::{DetectorConfig, Sample};

/// A peak located inside one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeak {
    /// Position inside the scanned window
    pub index: usize,
    pub sample: Sample,
    pub rotation_magnitude: f64,
    pub acceleration_magnitude: f64,
}

impl DetectedPeak {
    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.sample.timestamp
    }
}

/// Threshold + minimum-distance peak finder
///
/// Stateless between calls: `scan` is a pure function of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetector {
    height_threshold: f64,
    min_separation: usize,
}

impl PeakDetector {
    /// # Arguments
    /// * `height_threshold` - Minimum rotation magnitude (rad/s)
    /// * `min_separation` - Minimum samples between accepted peaks (at least 1)
    pub fn new(height_threshold: f64, min_separation: usize) -> Self {
        Self {
            height_threshold,
            min_separation: min_separation.max(1),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.height_threshold, config.min_separation)
    }

    pub fn height_threshold(&self) -> f64 {
        self.height_threshold
    }

    pub fn min_separation(&self) -> usize {
        self.min_separation
    }

    /// Find accepted peaks in `window`, ascending by index
    ///
    /// The first and last index are never reported. Windows shorter than
    /// three samples yield nothing.
    pub fn scan(&self, window: &[Sample]) -> Vec<DetectedPeak> {
        let magnitudes: Vec<f64> = window.iter().map(Sample::rotation_magnitude).collect();

        let candidates = self.find_candidates(&magnitudes);
        let accepted = self.suppress_close_candidates(&magnitudes, candidates);

        accepted
            .into_iter()
            .map(|index| {
                let sample = window[index];
                DetectedPeak {
                    index,
                    sample,
                    rotation_magnitude: magnitudes[index],
                    acceleration_magnitude: sample.acceleration_magnitude(),
                }
            })
            .collect()
    }

    /// Interior local maxima above threshold, plateaus collapsed to their first index
    fn find_candidates(&self, magnitudes: &[f64]) -> Vec<usize> {
        if magnitudes.len() < 3 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        let mut previous: Option<usize> = None;

        for i in 1..magnitudes.len() - 1 {
            let value = magnitudes[i];
            // NaN compares false and never qualifies
            let qualifies = value >= self.height_threshold
                && value >= magnitudes[i - 1]
                && value >= magnitudes[i + 1];
            if !qualifies {
                continue;
            }

            let continues_plateau =
                matches!(previous, Some(p) if p + 1 == i && magnitudes[p] == value);
            previous = Some(i);

            if !continues_plateau {
                candidates.push(i);
            }
        }

        candidates
    }

    fn suppress_close_candidates(&self, magnitudes: &[f64], mut candidates: Vec<usize>) -> Vec<usize> {
        // Highest first, earlier index wins ties
        candidates.sort_by(|&a, &b| magnitudes[b].total_cmp(&magnitudes[a]).then(a.cmp(&b)));

        let mut accepted: Vec<usize> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let far_enough = accepted
                .iter()
                .all(|&kept| candidate.abs_diff(kept) >= self.min_separation);
            if far_enough {
                accepted.push(candidate);
            }
        }

        accepted.sort_unstable();
        accepted
    }
}
