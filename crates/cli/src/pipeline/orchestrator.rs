//! Pipeline orchestrator - coordinates sources, the session registry and the
//! dispatcher.
//!
//! Each source gets its own session task. Batches flow from the source thread
//! through a bounded channel into `SessionRegistry::ingest_batch`; session
//! events leave through the `EventBus` to the dispatcher. On shutdown every
//! task stops its source and ends its session, so summaries are still
//! published.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use contracts::{FinishedSession, SampleBatch, SampleSource, TrackerBlueprint};
use dispatcher::EventBus;
use ingestion::{batch_channel, CsvReplaySource, MockSampleSource, MockSourceConfig, PlaybackConfig};
use swing_engine::{experimental, session_id_from_start_time, SessionRegistry, SystemClock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Prefix of derived session ids, e.g. `watch_20251108_024942`
const SESSION_ID_PREFIX: &str = "watch";

/// Batches buffered between a source thread and its session task
const BATCH_CHANNEL_CAPACITY: usize = 16;

/// How long sinks get to drain after the last session ends
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where samples come from
#[derive(Debug, Clone)]
pub enum SourceMode {
    /// `sessions` concurrent synthetic streams
    Mock {
        sessions: usize,
        stream: MockSourceConfig,
    },
    /// One session replaying a WristMotion CSV
    Replay { path: PathBuf },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: TrackerBlueprint,
    pub source: SourceMode,
    /// Explicit session id (derived from the start time when `None`)
    pub session_id: Option<String>,
    pub playback: PlaybackConfig,
    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Log the experimental speed estimate with every swing
    pub show_speed: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every session to completion, or until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::serve_metrics(port)?;
        }

        let sources = self.build_sources(Utc::now())?;
        info!(sessions = sources.len(), "Sample sources prepared");

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - session events will be dropped");
        }

        let (bus, event_rx) = EventBus::new(blueprint.pipeline.event_queue_capacity);
        let bus = Arc::new(bus);
        let dispatcher_handle = dispatcher::create_dispatcher(blueprint.sinks.clone(), event_rx)
            .await
            .map_err(CliError::from)?
            .spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        let registry = Arc::new(SessionRegistry::new(
            blueprint.detector.clone(),
            Arc::new(SystemClock),
            bus.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for source in sources {
            tasks.spawn(drive_session(
                Arc::clone(&registry),
                source,
                blueprint.pipeline.device.clone(),
                self.config.show_speed,
                shutdown_rx.clone(),
            ));
        }
        drop(shutdown_rx);

        let mut stats = PipelineStats::default();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(Ok(finished))) => stats.record_session(&finished),
                    Some(Ok(Err(e))) => {
                        warn!(error = %e, "Session aborted");
                        stats.failed_sessions += 1;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Session task panicked");
                        stats.failed_sessions += 1;
                    }
                    None => break,
                },
                () = &mut shutdown, if !stats.interrupted => {
                    info!(active = registry.len(), "Stopping active sessions");
                    stats.interrupted = true;
                    let _ = shutdown_tx.send(true);
                }
            }
        }

        // The registry holds the last publisher handle besides ours; dropping
        // both closes the bus and lets the dispatcher drain.
        stats.events_dropped = bus.dropped_count();
        drop(registry);
        drop(bus);

        match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(sink_metrics)) => stats.sink_metrics = sink_metrics,
            Ok(Err(e)) => error!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!(
                timeout_secs = DISPATCHER_DRAIN_TIMEOUT.as_secs(),
                "Dispatcher did not drain in time"
            ),
        }

        stats.duration = started.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            sessions = stats.sessions.len(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    fn build_sources(
        &self,
        start_time: DateTime<Utc>,
    ) -> Result<Vec<Box<dyn SampleSource>>, CliError> {
        let base_id = self
            .config
            .session_id
            .clone()
            .unwrap_or_else(|| session_id_from_start_time(SESSION_ID_PREFIX, start_time));
        let playback = &self.config.playback;

        match &self.config.source {
            SourceMode::Replay { path } => {
                info!(path = %path.display(), "Running in REPLAY mode");
                let source: Box<dyn SampleSource> =
                    Box::new(CsvReplaySource::load(path, "csv", base_id, playback.clone())?);
                Ok(vec![source])
            }
            SourceMode::Mock { sessions, stream } => {
                if *sessions == 0 {
                    return Err(CliError::invalid_options("at least one mock session is required"));
                }
                info!(sessions, "Running in MOCK mode (no watch required)");

                let sources = (0..*sessions)
                    .map(|i| {
                        let session_id = if *sessions == 1 {
                            base_id.clone()
                        } else {
                            format!("{base_id}_{:02}", i + 1)
                        };
                        let config = MockSourceConfig {
                            seed: stream.seed.wrapping_add(i as u64),
                            playback: playback.clone(),
                            ..stream.clone()
                        };
                        let source_id = format!("mock-{}", i + 1);
                        Box::new(MockSampleSource::new(source_id, session_id, config))
                            as Box<dyn SampleSource>
                    })
                    .collect();
                Ok(sources)
            }
        }
    }
}

/// Start a session, stream its source into the registry, then end it
#[instrument(
    name = "drive_session",
    skip_all,
    fields(session_id = %source.session_id(), source = %source.source_id())
)]
async fn drive_session(
    registry: Arc<SessionRegistry>,
    source: Box<dyn SampleSource>,
    device: String,
    show_speed: bool,
    mut shutdown: watch::Receiver<bool>,
) -> Result<FinishedSession, CliError> {
    let session_id = source.session_id().to_string();
    registry.start(&session_id, &device)?;

    let mut batches = batch_channel(source.as_ref(), BATCH_CHANNEL_CAPACITY);
    let streamed = stream_batches(&registry, &mut batches, show_speed, &mut shutdown).await;

    // Unblocks a source thread waiting on a full channel before joining it
    drop(batches);
    if let Err(e) = tokio::task::spawn_blocking(move || source.stop()).await {
        warn!(error = %e, "Source did not stop cleanly");
    }

    close_session(&registry, &session_id, streamed)
}

/// End the session whether or not streaming succeeded
///
/// A streaming error takes precedence over the outcome of ending.
fn close_session(
    registry: &SessionRegistry,
    session_id: &str,
    streamed: Result<(), CliError>,
) -> Result<FinishedSession, CliError> {
    let finished = registry.end_finished(session_id);
    if let Err(e) = &finished {
        warn!(session_id, error = %e, "Session could not be ended");
    }
    streamed?;
    Ok(finished?)
}

async fn stream_batches(
    registry: &SessionRegistry,
    batches: &mut mpsc::Receiver<SampleBatch>,
    show_speed: bool,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), CliError> {
    loop {
        tokio::select! {
            batch = batches.recv() => {
                let Some(batch) = batch else {
                    debug!("Source exhausted");
                    return Ok(());
                };
                for swing in registry.ingest_batch(&batch)? {
                    let speed_mph = show_speed
                        .then(|| experimental::estimate_speed_mph(swing.rotation_magnitude));
                    info!(
                        swing_id = %swing.swing_id(),
                        timestamp = swing.timestamp,
                        rotation_rad_s = swing.rotation_magnitude,
                        acceleration_g = swing.acceleration_magnitude,
                        speed_mph,
                        "Swing detected"
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Shutdown requested");
                    return Ok(());
                }
            }
        }
    }
}
