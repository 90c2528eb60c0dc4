//! # Observability
//!
//! Log output and Prometheus export for the swing tracker. The metric
//! recorders in [`metrics`] are no-ops until [`serve_metrics`] installs an
//! exporter, so library crates call them unconditionally.
//!
//! ```ignore
//! observability::init_tracing(LogFormat::Compact, "info")?;
//! observability::serve_metrics(9000)?;
//!
//! let summary = registry.end("watch_20251108_024942")?;
//! observability::record_session_ended(&summary);
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_active_sessions, record_batch_ingested, record_duplicate_batch, record_event_published,
    record_samples_skipped, record_session_ended, record_session_started, record_sink_write,
    record_swing_detected, RunningStats, SessionMetricsAggregator, SessionMetricsSummary,
    StatsSummary,
};

/// Shape of emitted log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with source location
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `default_level` when set. Fails if a subscriber is
/// already installed.
pub fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level '{default_level}'"))?;

    let output = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .context("Tracing subscriber already installed")
}

/// Expose `/metrics` on all interfaces at `port`
pub fn serve_metrics(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {addr}"))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(addr)
}
