//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::{SinkConfig, TrackerBlueprint};
use ingestion::{MockSourceConfig, Pacing, PlaybackConfig};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig, SourceMode};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let blueprint = resolve_blueprint(args)?;

    info!(
        window_capacity = blueprint.detector.window_capacity,
        height_threshold = blueprint.detector.height_threshold,
        min_separation = blueprint.detector.min_separation,
        batch_size = blueprint.pipeline.batch_size,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = build_pipeline_config(args, blueprint);
    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    let stats = pipeline
        .run(stop_requested(args.timeout))
        .await
        .context("Pipeline execution failed")?;

    info!(
        sessions = stats.sessions.len(),
        swings = stats.total_swings(),
        duration_secs = stats.duration.as_secs_f64(),
        interrupted = stats.interrupted,
        "Pipeline completed"
    );
    stats.print_summary();

    if stats.failed_sessions > 0 {
        anyhow::bail!("{} session(s) failed", stats.failed_sessions);
    }
    Ok(())
}

/// Configuration file (or defaults) with command-line overrides applied
fn resolve_blueprint(args: &RunArgs) -> Result<TrackerBlueprint> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            load_blueprint(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults with a log sink");
            TrackerBlueprint {
                sinks: vec![SinkConfig::log("console")],
                ..Default::default()
            }
        }
    };

    if let Some(batch_size) = args.batch_size {
        info!(batch_size, "Overriding batch size from CLI");
        blueprint.pipeline.batch_size = batch_size;
    }
    if let Some(output) = &args.output {
        info!(output = %output.display(), "Adding file sink from CLI");
        blueprint
            .sinks
            .push(SinkConfig::file("output", output.to_string_lossy()));
    }

    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after applying CLI overrides")?;
    Ok(blueprint)
}

fn build_pipeline_config(args: &RunArgs, blueprint: TrackerBlueprint) -> PipelineConfig {
    let playback = PlaybackConfig {
        batch_size: blueprint.pipeline.batch_size,
        pacing: if args.speed > 0.0 {
            Pacing::Realtime { speed: args.speed }
        } else {
            Pacing::Unpaced
        },
        duplicate_every: args.duplicate_every,
    };

    let source = match &args.replay {
        Some(path) => SourceMode::Replay { path: path.clone() },
        None => SourceMode::Mock {
            sessions: args.sessions,
            stream: MockSourceConfig {
                sample_rate_hz: blueprint.detector.nominal_rate_hz,
                duration_s: args.duration,
                swing_interval_s: args.swing_interval,
                seed: args.seed,
                ..Default::default()
            },
        },
    };

    PipelineConfig {
        blueprint,
        source,
        session_id: args.session_id.clone(),
        playback,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        show_speed: args.show_speed,
    }
}

/// Resolves on Ctrl+C, SIGTERM or after `timeout_secs` (0 = never)
async fn stop_requested(timeout_secs: u64) {
    let timeout = async {
        if timeout_secs == 0 {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        info!(timeout_secs, "Run timeout reached");
    };

    tokio::select! {
        _ = shutdown_signal() => {},
        _ = timeout => {},
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, ending sessions...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &TrackerBlueprint) {
    let detector = &blueprint.detector;
    println!("\n=== Configuration Summary ===\n");
    println!("Detector:");
    println!(
        "  Window: {} samples ({:.2}s)",
        detector.window_capacity,
        detector.window_span_s()
    );
    println!("  Height threshold: {} rad/s", detector.height_threshold);
    println!(
        "  Min separation: {} samples ({:.2}s)",
        detector.min_separation,
        detector.min_interval_s()
    );
    println!("  Retain raw samples: {}", detector.retain_raw_samples);

    println!("\nPipeline:");
    println!("  Device: {}", blueprint.pipeline.device);
    println!("  Batch size: {}", blueprint.pipeline.batch_size);
    println!(
        "  Event queue: {}",
        blueprint.pipeline.event_queue_capacity
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
