//! FrameSink trait - dispatcher output interface
//!
//! Defines the abstract interface for sinks, plus the per-tuple callback
//! type the dispatcher invokes before fanning out.

use std::sync::Arc;

use crate::{AlignedFrame, SyncError};

/// Per-tuple consumer callback
///
/// Registered with the dispatcher; invoked in registration order for every
/// aligned tuple before sink fan-out. Must be non-blocking.
pub type AlignedCallback = Arc<dyn Fn(&AlignedFrame) + Send + Sync>;

/// Aligned-frame output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one aligned frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &AlignedFrame) -> Result<(), SyncError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), SyncError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), SyncError>;
}
