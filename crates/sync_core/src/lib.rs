//! # Sync Core
//!
//! Exact-match multi-stream synchronizer.
//!
//! N producers push timestamped messages onto N lanes; a consumer polls for
//! tuples whose members all share one timestamp. Lanes disagreeing on their
//! front timestamp have their stragglers discarded rather than waited on.
//!
//! ## Usage
//!
//! ```
//! use contracts::AlignerConfig;
//! use sync_core::ExactAligner;
//!
//! let aligner: ExactAligner<&str> = ExactAligner::new(AlignerConfig::with_lane_count(2)).unwrap();
//!
//! aligner.add_message(0, 100, 1, "left").unwrap();
//! aligner.add_message(1, 100, 1, "right").unwrap();
//!
//! let tuple = aligner.try_get().unwrap();
//! assert_eq!(tuple, vec!["left", "right"]);
//! ```

mod aligner;
mod lane;

pub use aligner::ExactAligner;
pub use lane::{Envelope, Lane};

// Re-export contracts types
pub use contracts::{AlignerConfig, AlignerStats, SyncError, DEFAULT_CAPACITY_WATERMARK};
