//! # Dispatcher
//!
//! Consumer-side fan-out for aligned tuples.
//!
//! Responsibilities:
//! - Consume `AlignedFrame`s from the pipeline
//! - Invoke registered per-tuple callbacks in registration order
//! - Fan out to sinks through per-sink worker tasks, isolating slow sinks
//!   from the main path

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{AlignedCallback, AlignedFrame, FrameSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{JsonlSink, LogSink};
