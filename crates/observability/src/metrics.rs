//! Swing tracker metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator of
//! finished sessions for end-of-run reports.

use contracts::SessionSummary;
use metrics::{counter, gauge, histogram};

/// Record an accepted batch
pub fn record_batch_ingested(session_id: &str, samples: usize) {
    counter!("swing_tracker_batches_total", "session_id" => session_id.to_string()).increment(1);
    counter!("swing_tracker_samples_ingested_total").increment(samples as u64);
    histogram!("swing_tracker_batch_size").record(samples as f64);
}

/// Record a batch discarded as a duplicate delivery
pub fn record_duplicate_batch(session_id: &str, samples: usize) {
    counter!("swing_tracker_duplicate_batches_total", "session_id" => session_id.to_string())
        .increment(1);
    counter!("swing_tracker_duplicate_samples_total").increment(samples as u64);
}

/// Record samples skipped for data-quality reasons
///
/// `reason` is `non_finite` or `out_of_order`.
pub fn record_samples_skipped(reason: &'static str, count: u64) {
    if count > 0 {
        counter!("swing_tracker_samples_skipped_total", "reason" => reason).increment(count);
    }
}

/// Record an emitted swing
pub fn record_swing_detected(rotation_magnitude: f64) {
    counter!("swing_tracker_swings_total").increment(1);
    histogram!("swing_tracker_swing_rotation_magnitude").record(rotation_magnitude);
}

pub fn record_session_started() {
    counter!("swing_tracker_sessions_started_total").increment(1);
}

/// Record a finalized session
pub fn record_session_ended(summary: &SessionSummary) {
    counter!("swing_tracker_sessions_ended_total").increment(1);
    histogram!("swing_tracker_session_duration_s").record(summary.elapsed_seconds);
    histogram!("swing_tracker_session_swings").record(summary.total_swings_detected as f64);
    gauge!("swing_tracker_last_session_sample_rate_hz").set(summary.effective_sample_rate_hz);
}

pub fn record_active_sessions(count: usize) {
    gauge!("swing_tracker_active_sessions").set(count as f64);
}

/// Record a hand-off to the persistence queue
pub fn record_event_published(kind: &'static str, queued: bool) {
    let status = if queued { "queued" } else { "dropped" };
    counter!(
        "swing_tracker_events_published_total",
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// Record a sink write outcome
pub fn record_sink_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "swing_tracker_sink_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Aggregates finished sessions in memory
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    pub total_sessions: u64,
    pub total_samples: u64,
    pub total_swings: u64,
    pub total_duplicate_batches: u64,
    pub total_skipped_samples: u64,

    /// Swings per session
    pub swings_per_session: RunningStats,

    /// Effective sample rate per session (Hz)
    pub sample_rate: RunningStats,

    /// Session length (seconds)
    pub duration: RunningStats,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, summary: &SessionSummary) {
        self.total_sessions += 1;
        self.total_samples += summary.total_samples_ingested;
        self.total_swings += summary.total_swings_detected;
        self.total_duplicate_batches += summary.diagnostics.duplicate_batches;
        self.total_skipped_samples += summary.diagnostics.skipped_samples();

        self.swings_per_session
            .push(summary.total_swings_detected as f64);
        self.sample_rate.push(summary.effective_sample_rate_hz);
        self.duration.push(summary.elapsed_seconds);
    }

    pub fn summary(&self) -> SessionMetricsSummary {
        SessionMetricsSummary {
            total_sessions: self.total_sessions,
            total_samples: self.total_samples,
            total_swings: self.total_swings,
            total_duplicate_batches: self.total_duplicate_batches,
            skip_rate: if self.total_samples + self.total_skipped_samples > 0 {
                self.total_skipped_samples as f64
                    / (self.total_samples + self.total_skipped_samples) as f64
                    * 100.0
            } else {
                0.0
            },
            swings_per_session: StatsSummary::from(&self.swings_per_session),
            sample_rate_hz: StatsSummary::from(&self.sample_rate),
            duration_s: StatsSummary::from(&self.duration),
        }
    }
}

/// Aggregated report
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsSummary {
    pub total_sessions: u64,
    pub total_samples: u64,
    pub total_swings: u64,
    pub total_duplicate_batches: u64,
    /// Skipped samples as a percentage of all delivered samples
    pub skip_rate: f64,
    pub swings_per_session: StatsSummary,
    pub sample_rate_hz: StatsSummary,
    pub duration_s: StatsSummary,
}

impl std::fmt::Display for SessionMetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Metrics Summary ===")?;
        writeln!(f, "Sessions: {}", self.total_sessions)?;
        writeln!(f, "Samples ingested: {}", self.total_samples)?;
        writeln!(f, "Swings detected: {}", self.total_swings)?;
        writeln!(f, "Duplicate batches: {}", self.total_duplicate_batches)?;
        writeln!(f, "Skipped samples: {:.2}%", self.skip_rate)?;
        writeln!(f, "Swings per session: {}", self.swings_per_session)?;
        writeln!(f, "Sample rate (Hz): {}", self.sample_rate_hz)?;
        writeln!(f, "Duration (s): {}", self.duration_s)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
