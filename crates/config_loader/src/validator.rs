//! Configuration validation
//!
//! Rules:
//! - at least one stream; stream ids unique and non-empty
//! - drop_rate within [0, 0.99], tick_hz positive (field-level rules)
//! - capacity_watermark >= 1
//! - poll period nonzero
//! - sink names unique, queue capacities nonzero

use std::collections::HashSet;

use contracts::{PipelineBlueprint, SyncError};
use validator::Validate;

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    validate_fields(blueprint)?;
    validate_streams(blueprint)?;
    validate_poll(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Field-level rules from the `Validate` derive on the contracts types
fn validate_fields(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    blueprint.validate().map_err(|errors| {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        SyncError::config_validation(field, errors.to_string())
    })
}

fn validate_streams(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    if blueprint.streams.is_empty() {
        return Err(SyncError::config_validation(
            "streams",
            "at least one stream is required",
        ));
    }

    let mut seen = HashSet::new();
    for stream in &blueprint.streams {
        if !seen.insert(stream.id.as_str()) {
            return Err(SyncError::config_validation(
                "streams",
                format!("duplicate stream id '{}'", stream.id),
            ));
        }
    }
    Ok(())
}

fn validate_poll(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    if blueprint.poll.period_us == 0 {
        return Err(SyncError::config_validation(
            "poll.period_us",
            "poll period must be nonzero",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if sink.name.is_empty() {
            return Err(SyncError::config_validation("sinks", "sink name must not be empty"));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(SyncError::config_validation(
                "sinks",
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(SyncError::config_validation(
                "sinks",
                format!("sink '{}' queue_capacity must be nonzero", sink.name),
            ));
        }
    }
    Ok(())
}
