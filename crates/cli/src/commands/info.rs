//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::TrackerBlueprint;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    detector: DetectorInfo,
    pipeline: PipelineInfo,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct DetectorInfo {
    window_capacity: usize,
    window_span_s: f64,
    height_threshold: f64,
    min_separation: usize,
    min_interval_s: f64,
    nominal_rate_hz: f64,
    retain_raw_samples: bool,
}

#[derive(Serialize)]
struct PipelineInfo {
    device: String,
    batch_size: usize,
    event_queue_capacity: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &TrackerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let detector = &blueprint.detector;

    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            queue_capacity: s.queue_capacity,
            max_retries: s.max_retries,
            retry_backoff_ms: s.retry_backoff_ms,
            params: if args.sinks {
                s.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        detector: DetectorInfo {
            window_capacity: detector.window_capacity,
            window_span_s: detector.window_span_s(),
            height_threshold: detector.height_threshold,
            min_separation: detector.min_separation,
            min_interval_s: detector.min_interval_s(),
            nominal_rate_hz: detector.nominal_rate_hz,
            retain_raw_samples: detector.retain_raw_samples,
        },
        pipeline: PipelineInfo {
            device: blueprint.pipeline.device.clone(),
            batch_size: blueprint.pipeline.batch_size,
            event_queue_capacity: blueprint.pipeline.event_queue_capacity,
        },
        sinks,
    }
}

fn print_config_info(blueprint: &TrackerBlueprint, args: &InfoArgs) {
    let detector = &blueprint.detector;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Swing Tracker Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🎯 Detector");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Window: {} samples ({:.2}s at {} Hz)",
        detector.window_capacity,
        detector.window_span_s(),
        detector.nominal_rate_hz
    );
    println!("   ├─ Height threshold: {} rad/s", detector.height_threshold);
    println!(
        "   ├─ Min separation: {} samples ({:.2}s)",
        detector.min_separation,
        detector.min_interval_s()
    );
    println!("   └─ Retain raw samples: {}", detector.retain_raw_samples);

    println!("\n⚙️  Pipeline");
    println!("   ├─ Device: {}", blueprint.pipeline.device);
    println!("   ├─ Batch size: {}", blueprint.pipeline.batch_size);
    println!(
        "   └─ Event queue: {}",
        blueprint.pipeline.event_queue_capacity
    );

    if blueprint.sinks.is_empty() {
        println!("\n📤 Sinks: none");
    } else {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };

            println!(
                "   {} {} ({:?}, queue {}, {} retries)",
                prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.max_retries
            );

            if args.sinks {
                let mut params: Vec<_> = sink.params.iter().collect();
                params.sort();
                for (key, value) in params {
                    println!("   {}  • {} = {}", child_prefix, key, value);
                }
            }
        }
    }

    println!();
}
