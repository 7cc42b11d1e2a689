//! Aligner and pipeline configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Default per-lane buffered-depth watermark.
///
/// A lane deeper than this has stopped draining: either a source is
/// permanently skewed or the consumer stopped polling.
pub const DEFAULT_CAPACITY_WATERMARK: usize = 50;

/// Exact aligner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Number of lanes, fixed for the aligner's lifetime
    pub lane_count: usize,

    /// Optional per-lane names, used only for diagnostics.
    /// When present, the length must equal `lane_count`.
    pub lane_names: Option<Vec<String>>,

    /// Per-lane buffered-depth watermark; exceeding it raises `LaneOverflow`
    #[serde(default = "default_watermark")]
    pub capacity_watermark: usize,
}

fn default_watermark() -> usize {
    DEFAULT_CAPACITY_WATERMARK
}

impl AlignerConfig {
    /// Anonymous lanes with the default watermark
    pub fn with_lane_count(lane_count: usize) -> Self {
        Self {
            lane_count,
            lane_names: None,
            capacity_watermark: DEFAULT_CAPACITY_WATERMARK,
        }
    }

    /// One named lane per entry, default watermark
    pub fn named(lane_names: Vec<String>) -> Self {
        Self {
            lane_count: lane_names.len(),
            lane_names: Some(lane_names),
            capacity_watermark: DEFAULT_CAPACITY_WATERMARK,
        }
    }

    /// Override the watermark
    pub fn watermark(mut self, capacity_watermark: usize) -> Self {
        self.capacity_watermark = capacity_watermark;
        self
    }
}

/// Whole-pipeline configuration, loaded from TOML/JSON
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineBlueprint {
    /// One entry per stream; the entry's position is its lane index
    #[validate(nested)]
    pub streams: Vec<StreamConfig>,

    /// Aligner tuning
    #[serde(default)]
    #[validate(nested)]
    pub aligner: AlignerSettings,

    /// Consumer polling cadence
    #[serde(default)]
    pub poll: PollConfig,

    /// Simulated source parameters
    #[serde(default)]
    #[validate(nested)]
    pub mock: MockConfig,

    /// Output sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl PipelineBlueprint {
    /// Derive the aligner's own configuration: one named lane per stream,
    /// in declaration order.
    pub fn aligner_config(&self) -> AlignerConfig {
        AlignerConfig {
            lane_count: self.streams.len(),
            lane_names: Some(self.streams.iter().map(|s| s.id.clone()).collect()),
            capacity_watermark: self.aligner.capacity_watermark,
        }
    }
}

/// One stream declaration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamConfig {
    /// Stream id (also the lane's diagnostic name)
    #[validate(length(min = 1, message = "stream id must not be empty"))]
    pub id: String,

    /// Payload kind the simulated source generates
    #[serde(default)]
    pub payload: PayloadKind,

    /// Fraction of ticks the simulated source skips, to exercise
    /// straggler cleanup downstream
    #[serde(default)]
    #[validate(range(min = 0.0, max = 0.99, message = "drop_rate must be in [0, 0.99]"))]
    pub drop_rate: f64,
}

/// Payload kind for simulated sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    #[default]
    Image,
    Imu,
    Raw,
}

/// Aligner tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlignerSettings {
    /// Per-lane buffered-depth watermark
    #[validate(range(min = 1, message = "capacity_watermark must be at least 1"))]
    #[serde(default = "default_watermark")]
    pub capacity_watermark: usize,
}

impl Default for AlignerSettings {
    fn default() -> Self {
        Self {
            capacity_watermark: DEFAULT_CAPACITY_WATERMARK,
        }
    }
}

/// Consumer polling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Sleep between empty `try_get` polls (microseconds)
    pub period_us: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { period_us: 500 }
    }
}

/// Simulated source parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MockConfig {
    /// Shared tick frequency for all simulated streams (Hz).
    /// All streams stamp from the same tick sequence, so co-delivered
    /// frames carry identical timestamps.
    #[validate(range(min = 0.001, message = "tick_hz must be positive"))]
    pub tick_hz: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self { tick_hz: 20.0 }
    }
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name (used for logging/metrics)
    pub name: String,

    /// Sink implementation
    pub sink_type: SinkType,

    /// Per-sink queue capacity; the dispatcher drops frames when full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Implementation-specific parameters (e.g. `path` for the JSONL sink)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    64
}

/// Sink implementation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log a one-line summary per tuple
    Log,
    /// Append one JSON record per tuple to a file
    Jsonl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligner_config_builders() {
        let cfg = AlignerConfig::with_lane_count(3);
        assert_eq!(cfg.lane_count, 3);
        assert!(cfg.lane_names.is_none());
        assert_eq!(cfg.capacity_watermark, DEFAULT_CAPACITY_WATERMARK);

        let cfg = AlignerConfig::named(vec!["a".into(), "b".into()]).watermark(10);
        assert_eq!(cfg.lane_count, 2);
        assert_eq!(cfg.capacity_watermark, 10);
    }

    #[test]
    fn test_blueprint_defaults_from_json() {
        let json = r#"{
            "streams": [
                { "id": "cam_front" },
                { "id": "cam_rear", "drop_rate": 0.05 }
            ]
        }"#;
        let bp: PipelineBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(bp.streams.len(), 2);
        assert_eq!(bp.streams[0].payload, PayloadKind::Image);
        assert_eq!(bp.aligner.capacity_watermark, DEFAULT_CAPACITY_WATERMARK);
        assert_eq!(bp.poll.period_us, 500);
        assert!(bp.sinks.is_empty());

        let aligner = bp.aligner_config();
        assert_eq!(aligner.lane_count, 2);
        assert_eq!(
            aligner.lane_names.as_deref(),
            Some(&["cam_front".to_string(), "cam_rear".to_string()][..])
        );
    }

    #[test]
    fn test_blueprint_validation_rejects_bad_drop_rate() {
        let json = r#"{ "streams": [ { "id": "cam", "drop_rate": 1.5 } ] }"#;
        let bp: PipelineBlueprint = serde_json::from_str(json).unwrap();
        assert!(bp.validate().is_err());
    }
}
