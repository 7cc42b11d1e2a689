//! AlignedFrame - aligner output
//!
//! One exactly-aligned tuple: one packet per lane, all sharing a timestamp.

use serde::{Deserialize, Serialize};

use crate::StreamPacket;

/// Aligned tuple of packets, one per lane, in lane-index order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedFrame {
    /// The shared timestamp of every packet in the tuple (nanoseconds)
    pub timestamp: u64,

    /// Tuple sequence number (monotonically increasing per pipeline run)
    pub tuple_seq: u64,

    /// The packets, indexed by lane
    pub packets: Vec<StreamPacket>,

    /// Aligner bookkeeping at emission time
    pub meta: AlignMeta,
}

/// Aligner bookkeeping attached to each emitted tuple
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignMeta {
    /// Cumulative stragglers discarded by cleanup passes
    pub stragglers_dropped: u64,

    /// Cumulative timestamp regressions observed across lanes
    pub regressions: u64,

    /// Lane depths immediately after this tuple was popped
    pub lane_depths: Vec<usize>,
}

/// Aligner state snapshot (for diagnostics)
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlignerStats {
    /// Buffered depth per lane, in lane-index order
    pub lane_depths: Vec<usize>,

    /// Tuples emitted so far
    pub tuples_emitted: u64,

    /// Stragglers discarded by cleanup passes so far
    pub stragglers_dropped: u64,

    /// Timestamp regressions observed so far
    pub regressions: u64,
}
