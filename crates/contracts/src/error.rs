//! Layered error definitions
//!
//! Categorized by source: config / aligner / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Aligner construction error (lane count / name list mismatch)
    #[error("invalid aligner configuration: {message}")]
    InvalidConfiguration { message: String },

    // ===== Aligner Errors =====
    /// Lane index outside `[0, lane_count)` - caller bug, surfaced immediately
    #[error("lane index {index} out of range (lane count {lane_count})")]
    LaneOutOfRange { index: usize, lane_count: usize },

    /// A lane's buffered depth exceeded its watermark: nothing is draining
    /// the lane, synchronization is broken
    #[error("lane {lane}{} overflow: depth={depth}, watermark={watermark}", .name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default())]
    LaneOverflow {
        lane: usize,
        name: Option<String>,
        depth: usize,
        watermark: usize,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create aligner construction error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal for the producer path that raised it.
    ///
    /// Timestamp regressions never surface as errors; everything that does
    /// is fatal for its origin except sink writes, which the dispatcher
    /// isolates per sink.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SinkWrite { .. })
    }
}
