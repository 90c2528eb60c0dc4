//! Per-session swing tracking state machine.
//!
//! One `SessionTracker` owns the window, the detector, the received-range set
//! and the counters of a single session. It performs no I/O: the registry
//! publishes whatever `IngestOutcome` reports.

use chrono::{DateTime, Utc};
use contracts::{
    DetectorConfig, DetectorStats, FinishedSession, Sample, SessionDiagnostics, SessionState,
    SessionSummary, Swing,
};
use tracing::{debug, instrument, warn};

use crate::buffer::MagnitudeBuffer;
use crate::error::TrackerError;
use crate::peak::PeakDetector;
use crate::ranges::ReceivedRanges;

/// Slack when comparing swing spacing against the minimum interval (seconds)
const SPACING_TOLERANCE_S: f64 = 1e-6;

/// Identity of a freshly started session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    pub device: String,
    pub start_time: DateTime<Utc>,
}

/// Accepted samples of one batch, for raw retention
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub start_timestamp: f64,
    pub end_timestamp: f64,
    pub samples: Vec<Sample>,
}

/// What one `ingest` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Newly emitted swings, ascending
    pub swings: Vec<Swing>,

    /// Accepted samples (only when raw retention is on)
    pub raw: Option<RawBatch>,

    /// Samples appended to the window
    pub accepted_samples: usize,

    /// Whole batch discarded as a re-delivery
    pub duplicate: bool,

    /// Samples dropped for NaN/infinite values
    pub non_finite_samples: usize,

    /// Samples dropped for going backwards in time
    pub out_of_order_samples: usize,
}

/// State of one recording session
#[derive(Debug)]
pub struct SessionTracker {
    session_id: String,
    device: String,
    state: SessionState,
    config: DetectorConfig,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    window: MagnitudeBuffer,
    detector: PeakDetector,
    received: ReceivedRanges,
    first_sample_timestamp: Option<f64>,
    last_sample_timestamp: Option<f64>,
    last_swing_timestamp: Option<f64>,
    swings: Vec<Swing>,
    total_samples_ingested: u64,
    diagnostics: SessionDiagnostics,
}

impl SessionTracker {
    /// Create a tracker in `Recording` state
    pub fn new(
        session_id: impl Into<String>,
        device: impl Into<String>,
        config: DetectorConfig,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            device: device.into(),
            state: SessionState::Recording,
            window: MagnitudeBuffer::new(config.window_capacity),
            detector: PeakDetector::from_config(&config),
            config,
            start_time,
            end_time: None,
            received: ReceivedRanges::new(),
            first_sample_timestamp: None,
            last_sample_timestamp: None,
            last_swing_timestamp: None,
            swings: Vec::new(),
            total_samples_ingested: 0,
            diagnostics: SessionDiagnostics::default(),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            device: self.device.clone(),
            start_time: self.start_time,
        }
    }

    /// Feed one batch through dedup, the window and the detector
    ///
    /// # Errors
    /// `UnknownSession` once the session has ended.
    #[instrument(
        level = "trace",
        name = "session_tracker_ingest",
        skip(self, batch),
        fields(session_id = %self.session_id, batch_len = batch.len())
    )]
    pub fn ingest(&mut self, batch: &[Sample]) -> Result<IngestOutcome, TrackerError> {
        if self.state != SessionState::Recording {
            return Err(TrackerError::unknown_session(&self.session_id));
        }

        let mut outcome = IngestOutcome::default();

        let finite: Vec<Sample> = batch.iter().copied().filter(Sample::is_finite).collect();
        outcome.non_finite_samples = batch.len() - finite.len();
        if outcome.non_finite_samples > 0 {
            self.diagnostics.non_finite_samples += outcome.non_finite_samples as u64;
            warn!(
                session_id = %self.session_id,
                skipped = outcome.non_finite_samples,
                "Skipping non-finite samples"
            );
        }

        let Some((start, end)) = timestamp_range(&finite) else {
            self.diagnostics.empty_batches += 1;
            debug!(session_id = %self.session_id, "Batch has no usable samples");
            return Ok(outcome);
        };

        if !self.received.insert(start, end) {
            self.diagnostics.duplicate_batches += 1;
            self.diagnostics.duplicate_samples += finite.len() as u64;
            debug!(
                session_id = %self.session_id,
                start,
                end,
                samples = finite.len(),
                "Duplicate batch discarded"
            );
            outcome.duplicate = true;
            return Ok(outcome);
        }

        let accepted = self.drop_out_of_order(finite, &mut outcome);
        outcome.accepted_samples = accepted.len();

        if !accepted.is_empty() {
            self.first_sample_timestamp
                .get_or_insert(accepted[0].timestamp);
            self.window.extend(accepted.iter().copied());
            self.total_samples_ingested += accepted.len() as u64;
            outcome.swings = self.emit_new_swings();
        }

        if self.config.retain_raw_samples && !accepted.is_empty() {
            outcome.raw = Some(RawBatch {
                start_timestamp: start,
                end_timestamp: end,
                samples: accepted,
            });
        }

        Ok(outcome)
    }

    /// Keep samples that do not go backwards relative to the last accepted one
    fn drop_out_of_order(&mut self, samples: Vec<Sample>, outcome: &mut IngestOutcome) -> Vec<Sample> {
        let mut accepted = Vec::with_capacity(samples.len());
        for sample in samples {
            match self.last_sample_timestamp {
                Some(last) if sample.timestamp < last => {
                    outcome.out_of_order_samples += 1;
                }
                _ => {
                    self.last_sample_timestamp = Some(sample.timestamp);
                    accepted.push(sample);
                }
            }
        }

        if outcome.out_of_order_samples > 0 {
            self.diagnostics.out_of_order_samples += outcome.out_of_order_samples as u64;
            warn!(
                session_id = %self.session_id,
                skipped = outcome.out_of_order_samples,
                "Skipping out-of-order samples"
            );
        }

        accepted
    }

    /// Scan the window and keep only peaks newer than the last emitted swing
    fn emit_new_swings(&mut self) -> Vec<Swing> {
        let snapshot = self.window.snapshot();
        let min_interval = self.config.min_interval_s();
        let mut emitted = Vec::new();

        for peak in self.detector.scan(&snapshot) {
            let timestamp = peak.timestamp();
            if let Some(last) = self.last_swing_timestamp {
                if timestamp <= last || timestamp - last < min_interval - SPACING_TOLERANCE_S {
                    continue;
                }
            }

            let swing = Swing {
                session_id: self.session_id.clone(),
                sequence_number: self.swings.len() as u32 + 1,
                timestamp,
                rotation_magnitude: peak.rotation_magnitude,
                acceleration_magnitude: peak.acceleration_magnitude,
                peak_sample: peak.sample,
            };

            debug!(
                session_id = %self.session_id,
                sequence_number = swing.sequence_number,
                timestamp,
                rotation_magnitude = swing.rotation_magnitude,
                "Swing detected"
            );

            self.last_swing_timestamp = Some(timestamp);
            self.swings.push(swing.clone());
            emitted.push(swing);
        }

        emitted
    }

    /// Transition to `Ended` and compute the final record
    ///
    /// # Errors
    /// `UnknownSession` if the session already ended.
    pub fn finish(&mut self, end_time: DateTime<Utc>) -> Result<FinishedSession, TrackerError> {
        if self.state != SessionState::Recording {
            return Err(TrackerError::unknown_session(&self.session_id));
        }

        self.state = SessionState::Ended;
        self.end_time = Some(end_time);

        let elapsed_seconds = elapsed_seconds(self.start_time, end_time);
        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            device: self.device.clone(),
            start_time: self.start_time,
            end_time,
            total_samples_ingested: self.total_samples_ingested,
            total_swings_detected: self.swings.len() as u64,
            elapsed_seconds,
            effective_sample_rate_hz: rate(self.total_samples_ingested, elapsed_seconds),
            first_sample_timestamp: self.first_sample_timestamp,
            last_sample_timestamp: self.last_sample_timestamp,
            diagnostics: self.diagnostics,
        };

        Ok(FinishedSession {
            summary,
            swings: self.swings.clone(),
        })
    }

    /// Live statistics as of `now`
    pub fn stats(&self, now: DateTime<Utc>) -> DetectorStats {
        let elapsed = elapsed_seconds(self.start_time, self.end_time.unwrap_or(now));
        DetectorStats {
            session_id: self.session_id.clone(),
            state: self.state,
            total_samples_ingested: self.total_samples_ingested,
            total_swings_detected: self.swings.len() as u64,
            window_len: self.window.len(),
            window_capacity: self.window.capacity(),
            elapsed_seconds: elapsed,
            sample_rate_hz: rate(self.total_samples_ingested, elapsed),
            height_threshold: self.detector.height_threshold(),
            min_separation: self.detector.min_separation(),
            diagnostics: self.diagnostics,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn swings(&self) -> &[Swing] {
        &self.swings
    }

    pub fn total_samples_ingested(&self) -> u64 {
        self.total_samples_ingested
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.diagnostics
    }

    pub fn received_ranges(&self) -> &ReceivedRanges {
        &self.received
    }
}

fn timestamp_range(samples: &[Sample]) -> Option<(f64, f64)> {
    samples.iter().fold(None, |range, sample| {
        let t = sample.timestamp;
        Some(match range {
            None => (t, t),
            Some((lo, hi)) => (f64::min(lo, t), f64::max(hi, t)),
        })
    })
}

fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn rate(samples: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 {
        samples as f64 / elapsed_seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use contracts::Vector3;

    fn config(window_capacity: usize, height_threshold: f64, min_separation: usize) -> DetectorConfig {
        DetectorConfig {
            window_capacity,
            height_threshold,
            min_separation,
            nominal_rate_hz: 100.0,
            retain_raw_samples: true,
        }
    }

    fn tracker(config: DetectorConfig) -> SessionTracker {
        SessionTracker::new("s1", "AppleWatch", config, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Samples at 100 Hz starting at index `offset`, magnitudes from `magnitudes`
    fn samples(offset: usize, magnitudes: &[f64]) -> Vec<Sample> {
        magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                Sample::new(
                    (offset + i) as f64 * 0.01,
                    Vector3::new(0.0, m, 0.0),
                    Vector3::new(0.2, 0.0, 0.0),
                )
            })
            .collect()
    }

    /// Quiet signal with bumps peaking at the given indices
    fn signal_with_bumps(len: usize, peaks: &[usize], height: f64) -> Vec<f64> {
        let mut signal = vec![0.3; len];
        for &p in peaks {
            for d in 0..5usize {
                let value = height - d as f64 * 0.5;
                if p >= d {
                    signal[p - d] = f64::max(signal[p - d], value);
                }
                if p + d < len {
                    signal[p + d] = f64::max(signal[p + d], value);
                }
            }
        }
        signal
    }

    #[test]
    fn test_single_peak_scenario() {
        let mut t = tracker(config(5, 2.0, 2));
        let outcome = t.ingest(&samples(0, &[0.1, 0.2, 2.5, 2.0, 0.1])).unwrap();

        assert_eq!(outcome.swings.len(), 1);
        let swing = &outcome.swings[0];
        assert_eq!(swing.sequence_number, 1);
        assert!((swing.timestamp - 0.02).abs() < 1e-12);
        assert!((swing.rotation_magnitude - 2.5).abs() < 1e-12);
        assert_eq!(swing.session_id, "s1");
    }

    #[test]
    fn test_duplicate_batch_is_idempotent() {
        let mut t = tracker(config(300, 2.0, 50));
        let batch = samples(0, &signal_with_bumps(100, &[40], 4.0));

        let first = t.ingest(&batch).unwrap();
        assert_eq!(first.swings.len(), 1);
        assert!(!first.duplicate);

        let second = t.ingest(&batch).unwrap();
        assert!(second.duplicate);
        assert!(second.swings.is_empty());
        assert!(second.raw.is_none());

        assert_eq!(t.total_samples_ingested(), 100);
        assert_eq!(t.diagnostics().duplicate_batches, 1);
        assert_eq!(t.diagnostics().duplicate_samples, 100);
        assert_eq!(t.received_ranges().len(), 1);
    }

    #[test]
    fn test_overlapping_batch_rejected() {
        let mut t = tracker(config(300, 2.0, 50));
        t.ingest(&samples(0, &[0.1; 100])).unwrap();

        let outcome = t.ingest(&samples(50, &[0.1; 100])).unwrap();
        assert!(outcome.duplicate);
        assert_eq!(t.total_samples_ingested(), 100);
    }

    #[test]
    fn test_batch_starting_at_previous_end_accepted() {
        let mut t = tracker(config(300, 2.0, 50));
        t.ingest(&samples(0, &[0.1; 3])).unwrap();

        let outcome = t.ingest(&samples(2, &[0.1; 4])).unwrap();
        assert!(!outcome.duplicate);
        assert_eq!(outcome.accepted_samples, 4);
        assert_eq!(t.total_samples_ingested(), 7);
        assert_eq!(t.diagnostics().duplicate_batches, 0);

        assert!(t.ingest(&samples(2, &[0.1; 4])).unwrap().duplicate);
    }

    #[test]
    fn test_peak_not_reemitted_on_later_scans() {
        let mut t = tracker(config(300, 2.0, 50));
        let signal = signal_with_bumps(400, &[60, 250], 4.0);

        let mut all = Vec::new();
        for (n, chunk) in signal.chunks(100).enumerate() {
            let outcome = t.ingest(&samples(n * 100, chunk)).unwrap();
            all.extend(outcome.swings);
        }

        let timestamps: Vec<f64> = all.iter().map(|s| s.timestamp).collect();
        assert_eq!(all.len(), 2, "timestamps: {timestamps:?}");
        assert!((timestamps[0] - 0.60).abs() < 1e-9);
        assert!((timestamps[1] - 2.50).abs() < 1e-9);
        assert_eq!(t.swings().len(), 2);
    }

    #[test]
    fn test_sequence_numbers_gapless_and_spacing_respected() {
        let mut t = tracker(config(300, 2.0, 50));
        let peaks: Vec<usize> = (0..12).map(|k| 30 + k * 73).collect();
        let signal = signal_with_bumps(1000, &peaks, 5.0);

        let mut all = Vec::new();
        for (n, chunk) in signal.chunks(37).enumerate() {
            all.extend(t.ingest(&samples(n * 37, chunk)).unwrap().swings);
        }

        assert_eq!(all.len(), peaks.len());
        for (k, swing) in all.iter().enumerate() {
            assert_eq!(swing.sequence_number, k as u32 + 1);
            assert!(swing.rotation_magnitude >= 2.0);
        }
        for pair in all.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 0.5 - 1e-6);
        }
    }

    #[test]
    fn test_close_peak_in_later_scan_suppressed() {
        // Second bump 20 samples after the first, arriving in a later batch
        let mut t = tracker(config(300, 2.0, 50));
        let signal = signal_with_bumps(200, &[40, 60], 4.0);

        let first = t.ingest(&samples(0, &signal[..50])).unwrap();
        let second = t.ingest(&samples(50, &signal[50..])).unwrap();

        assert_eq!(first.swings.len() + second.swings.len(), 1);
    }

    #[test]
    fn test_window_capacity_bound() {
        let mut t = tracker(config(50, 2.0, 10));
        for n in 0..20 {
            t.ingest(&samples(n * 13, &[0.5; 13])).unwrap();
            assert!(t.window_len() <= 50);
        }
        assert_eq!(t.window_len(), 50);
    }

    #[test]
    fn test_non_finite_samples_skipped() {
        let mut t = tracker(config(300, 2.0, 5));
        let mut batch = samples(0, &[0.1, 0.2, 3.0, 0.2, 0.1]);
        batch[1].rotation_rate.x = f64::NAN;
        batch[3].acceleration.z = f64::INFINITY;

        let outcome = t.ingest(&batch).unwrap();
        assert_eq!(outcome.non_finite_samples, 2);
        assert_eq!(outcome.accepted_samples, 3);
        assert_eq!(t.total_samples_ingested(), 3);
        assert_eq!(t.diagnostics().non_finite_samples, 2);
        assert_eq!(outcome.swings.len(), 1);
    }

    #[test]
    fn test_all_non_finite_batch_records_nothing() {
        let mut t = tracker(config(300, 2.0, 5));
        let mut batch = samples(0, &[0.1, 0.2]);
        for sample in &mut batch {
            sample.timestamp = f64::NAN;
        }

        let outcome = t.ingest(&batch).unwrap();
        assert_eq!(outcome.accepted_samples, 0);
        assert!(!outcome.duplicate);
        assert!(t.received_ranges().is_empty());
        assert_eq!(t.diagnostics().empty_batches, 1);
    }

    #[test]
    fn test_out_of_order_samples_skipped() {
        let mut t = tracker(config(300, 2.0, 5));
        let mut batch = samples(0, &[0.1, 0.2, 0.3, 0.4]);
        batch.swap(1, 2);

        let outcome = t.ingest(&batch).unwrap();
        assert_eq!(outcome.out_of_order_samples, 1);
        assert_eq!(t.total_samples_ingested(), 3);
    }

    #[test]
    fn test_raw_retention_toggle() {
        let mut t = tracker(config(300, 2.0, 5));
        let raw = t.ingest(&samples(0, &[0.1, 0.2])).unwrap().raw.unwrap();
        assert_eq!(raw.samples.len(), 2);
        assert!((raw.end_timestamp - 0.01).abs() < 1e-12);

        let mut cfg = config(300, 2.0, 5);
        cfg.retain_raw_samples = false;
        let mut t = tracker(cfg);
        assert!(t.ingest(&samples(0, &[0.1, 0.2])).unwrap().raw.is_none());
    }

    #[test]
    fn test_finish_summary_and_rate() {
        let mut t = tracker(config(300, 2.0, 50));
        for n in 0..10 {
            t.ingest(&samples(n * 100, &[0.4; 100])).unwrap();
        }

        let end = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(10);
        let finished = t.finish(end).unwrap();
        let summary = finished.summary;

        assert_eq!(summary.total_samples_ingested, 1000);
        assert!((summary.elapsed_seconds - 10.0).abs() < 1e-9);
        assert!((summary.effective_sample_rate_hz - 100.0).abs() < 1e-6);
        assert_eq!(summary.first_sample_timestamp, Some(0.0));
        assert_eq!(t.state(), SessionState::Ended);
    }

    #[test]
    fn test_ingest_after_finish_rejected() {
        let mut t = tracker(config(300, 2.0, 50));
        t.finish(DateTime::<Utc>::UNIX_EPOCH).unwrap();

        let err = t.ingest(&samples(0, &[0.1])).unwrap_err();
        assert_eq!(err, TrackerError::unknown_session("s1"));
        assert!(t.finish(DateTime::<Utc>::UNIX_EPOCH).is_err());
    }

    #[test]
    fn test_zero_elapsed_rate_is_zero() {
        let mut t = tracker(config(300, 2.0, 50));
        t.ingest(&samples(0, &[0.1; 10])).unwrap();
        let summary = t.finish(DateTime::<Utc>::UNIX_EPOCH).unwrap().summary;
        assert_eq!(summary.effective_sample_rate_hz, 0.0);
    }
}
