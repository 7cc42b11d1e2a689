//! StreamSource trait - stream data source abstraction
//!
//! Defines a unified interface for message producers, decoupling the
//! ingestion glue from where messages actually come from. A source could be
//! a middleware subscription, a device driver thread or a simulated stream;
//! the aligner never sees the difference.

use std::sync::Arc;

use crate::StreamPacket;

/// Stream data callback type
///
/// When a source produces a message, it sends a `StreamPacket` through this
/// callback. Uses `Arc` to allow callback sharing across multiple contexts.
/// The callback runs on the source's own thread, so implementations must be
/// non-blocking.
pub type StreamCallback = Arc<dyn Fn(StreamPacket) + Send + Sync>;

/// Stream data source trait
///
/// The producer-side boundary of the pipeline. Implementations must deliver
/// packets with timestamps comparable across all sources (a shared capture
/// clock) and a per-stream monotonic sequence number.
pub trait StreamSource: Send + Sync {
    /// Get stream ID
    fn stream_id(&self) -> &str;

    /// Register data callback
    ///
    /// When the source produces a message, it calls the callback with the
    /// `StreamPacket`. If already listening, repeated calls are idempotent
    /// (a second callback is not registered).
    fn listen(&self, callback: StreamCallback);

    /// Stop producing
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
