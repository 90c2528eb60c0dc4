//! `validate`: load a config file and report problems without running

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SinkType, TrackerBlueprint};

use super::load_blueprint;
use crate::cli::ValidateArgs;
use crate::error::CliError;

#[derive(Serialize)]
struct ValidationReport {
    config_path: String,
    valid: bool,
    /// Dotted path of the offending setting, when a rule was broken
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detector: Option<DetectorOverview>,
}

#[derive(Serialize)]
struct DetectorOverview {
    version: String,
    window_capacity: usize,
    height_threshold: f64,
    min_separation: usize,
    nominal_rate_hz: f64,
    sink_count: usize,
}

impl ValidationReport {
    fn new(config_path: String, outcome: Result<TrackerBlueprint, CliError>) -> Self {
        match outcome {
            Ok(blueprint) => Self {
                config_path,
                valid: true,
                field: None,
                error: None,
                warnings: collect_warnings(&blueprint),
                detector: Some(DetectorOverview {
                    version: format!("{:?}", blueprint.version),
                    window_capacity: blueprint.detector.window_capacity,
                    height_threshold: blueprint.detector.height_threshold,
                    min_separation: blueprint.detector.min_separation,
                    nominal_rate_hz: blueprint.detector.nominal_rate_hz,
                    sink_count: blueprint.sinks.len(),
                }),
            },
            Err(e) => Self {
                config_path,
                valid: false,
                field: match &e {
                    CliError::Config(inner) => inner.field().map(str::to_owned),
                    _ => None,
                },
                error: Some(e.to_string()),
                warnings: Vec::new(),
                detector: None,
            },
        }
    }

    fn print(&self) {
        if !self.valid {
            println!("✗ {} is invalid", self.config_path);
            if let Some(field) = &self.field {
                println!("  at {field}");
            }
            if let Some(error) = &self.error {
                println!("  {error}");
            }
            return;
        }

        println!("✓ {} is valid", self.config_path);
        if let Some(d) = &self.detector {
            println!(
                "  {} | window {} | threshold {} rad/s | separation {} | {} Hz | {} sink(s)",
                d.version,
                d.window_capacity,
                d.height_threshold,
                d.min_separation,
                d.nominal_rate_hz,
                d.sink_count
            );
        }
        for warning in &self.warnings {
            println!("  ⚠ {warning}");
        }
    }
}

/// Fails when the configuration does not load
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let report = check(args);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        report.print();
    }

    anyhow::ensure!(report.valid, "{} failed validation", report.config_path);
    Ok(())
}

fn check(args: &ValidateArgs) -> ValidationReport {
    ValidationReport::new(args.config.display().to_string(), load_blueprint(&args.config))
}

/// Settings that load fine but are probably not what the user meant
fn collect_warnings(blueprint: &TrackerBlueprint) -> Vec<String> {
    let detector = &blueprint.detector;
    let has_file_sink = blueprint.sinks.iter().any(|s| s.sink_type == SinkType::File);

    let checks = [
        (
            blueprint.sinks.is_empty(),
            "No sinks configured - sessions will not be persisted".to_string(),
        ),
        (
            detector.height_threshold == 0.0,
            "height_threshold is 0 - every local maximum counts as a swing".to_string(),
        ),
        (
            detector.window_capacity < 2 * detector.min_separation,
            format!(
                "window of {} samples holds at most one swing at min_separation {}",
                detector.window_capacity, detector.min_separation
            ),
        ),
        (
            detector.retain_raw_samples && !has_file_sink && !blueprint.sinks.is_empty(),
            "retain_raw_samples is on but no file sink stores raw buffers".to_string(),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(hit, message)| hit.then_some(message))
        .collect()
}
