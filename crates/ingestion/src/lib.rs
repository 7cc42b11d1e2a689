//! # Ingestion
//!
//! Producer-side glue: binds callback-driven [`StreamSource`]s to the
//! aligner's lanes.
//!
//! Each registered source gets one lane, in registration order. The
//! source's callback runs on the producer's own thread and calls
//! `ExactAligner::add_message` directly; faults (lane overflow, lane index
//! bugs) are forwarded on a bounded channel so the embedding pipeline can
//! apply its reset/alert/shutdown policy without ever blocking a producer.

mod bridge;
mod mock_source;
mod stats;

pub use bridge::{FaultEvent, Ingestion, StreamBridge};
pub use mock_source::{MockStreamConfig, MockStreamSource};
pub use stats::{IngestMetrics, IngestSnapshot};

pub use contracts::{StreamCallback, StreamSource};
