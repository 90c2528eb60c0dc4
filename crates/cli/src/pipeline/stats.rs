//! Pipeline statistics and end-of-run report.

use std::time::Duration;

use contracts::{FinishedSession, SessionSummary};
use dispatcher::MetricsSnapshot;
use observability::SessionMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Summaries of every session that ended normally
    pub sessions: Vec<SessionSummary>,

    /// Sessions that stopped on an error
    pub failed_sessions: usize,

    /// Events the bus rejected because the dispatcher fell behind
    pub events_dropped: u64,

    /// Final per-sink counters
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,

    /// Whether the run was cut short by a signal or timeout
    pub interrupted: bool,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Cross-session aggregates
    pub aggregate: SessionMetricsAggregator,
}

impl PipelineStats {
    pub fn record_session(&mut self, finished: &FinishedSession) {
        self.aggregate.update(&finished.summary);
        self.sessions.push(finished.summary.clone());
    }

    pub fn total_swings(&self) -> u64 {
        self.sessions.iter().map(|s| s.total_swings_detected).sum()
    }

    /// Samples ingested per second of wall time across all sessions
    pub fn throughput(&self) -> f64 {
        let samples: u64 = self.sessions.iter().map(|s| s.total_samples_ingested).sum();
        if self.duration.as_secs_f64() > 0.0 {
            samples as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                  Swing Tracker Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sessions: {} ({} failed)", self.sessions.len(), self.failed_sessions);
        println!("   ├─ Swings: {}", self.total_swings());
        println!("   ├─ Throughput: {:.0} samples/s", self.throughput());
        println!("   ├─ Events dropped: {}", self.events_dropped);
        println!("   └─ Interrupted: {}", self.interrupted);

        if !self.sessions.is_empty() {
            println!("\n🎾 Sessions");
            for (i, summary) in self.sessions.iter().enumerate() {
                let prefix = if i + 1 == self.sessions.len() { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} swings, {} samples, {} duplicate batches, {} skipped",
                    prefix,
                    summary.session_id,
                    summary.total_swings_detected,
                    summary.total_samples_ingested,
                    summary.diagnostics.duplicate_batches,
                    summary.diagnostics.skipped_samples()
                );
            }
        }

        let aggregate = self.aggregate.summary();
        println!("\n📈 Aggregates");
        println!("   ├─ Swings per session: {}", aggregate.swings_per_session);
        println!("   ├─ Sample rate (Hz): {}", aggregate.sample_rate_hz);
        println!("   └─ Skipped samples: {:.2}%", aggregate.skip_rate);

        if !self.sink_metrics.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, metrics)) in self.sink_metrics.iter().enumerate() {
                let prefix = if i + 1 == self.sink_metrics.len() { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} written, {} retries, {} lost ({} failed, {} dropped)",
                    prefix,
                    name,
                    metrics.write_count,
                    metrics.retry_count,
                    metrics.lost(),
                    metrics.failure_count,
                    metrics.dropped_count
                );
            }
        }

        println!();
    }
}
