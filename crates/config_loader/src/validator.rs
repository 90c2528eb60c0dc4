//! Configuration validation
//!
//! Rules:
//! - detector field ranges (`validator` derive on `DetectorConfig`)
//! - height_threshold finite
//! - min_separation < window_capacity
//! - batch_size and event_queue_capacity >= 1
//! - sink names non-empty and unique, queue_capacity >= 1
//! - file sinks carry `base_path`

use std::collections::HashSet;

use contracts::{ContractError, SinkType, TrackerBlueprint};
use validator::Validate;

/// Validate a TrackerBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    validate_detector_ranges(blueprint)?;
    validate_detector_relations(blueprint)?;
    validate_pipeline(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_detector_ranges(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let Err(errors) = blueprint.detector.validate() else {
        return Ok(());
    };

    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let Some(field) = fields.first() else {
        return Err(ContractError::config_validation("detector", errors.to_string()));
    };
    let message = field_errors[*field]
        .first()
        .and_then(|e| e.message.as_ref())
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("invalid value for {field}"));

    Err(ContractError::config_validation(
        format!("detector.{field}"),
        message,
    ))
}

fn validate_detector_relations(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let detector = &blueprint.detector;

    if !detector.height_threshold.is_finite() {
        return Err(ContractError::config_validation(
            "detector.height_threshold",
            format!("height_threshold must be finite, got {}", detector.height_threshold),
        ));
    }

    if detector.min_separation >= detector.window_capacity {
        return Err(ContractError::config_validation(
            "detector.min_separation / detector.window_capacity",
            format!(
                "min_separation ({}) must be < window_capacity ({})",
                detector.min_separation, detector.window_capacity
            ),
        ));
    }

    Ok(())
}

fn validate_pipeline(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let pipeline = &blueprint.pipeline;

    if pipeline.batch_size == 0 {
        return Err(ContractError::config_validation(
            "pipeline.batch_size",
            "batch_size must be >= 1",
        ));
    }
    if pipeline.event_queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "pipeline.event_queue_capacity",
            "event_queue_capacity must be >= 1",
        ));
    }
    if pipeline.device.trim().is_empty() {
        return Err(ContractError::config_validation(
            "pipeline.device",
            "device cannot be empty",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be >= 1",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("base_path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.base_path", sink.name),
                "file sink requires base_path",
            ));
        }
    }
    Ok(())
}
