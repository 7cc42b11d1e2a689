//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are unsigned integers (nanoseconds) on a shared capture clock
//! - Alignment is exact: a tuple is emitted only when every lane's front
//!   timestamp is identical
//! - `sequence` is a per-stream monotonic counter, used for diagnostics

mod config;
mod error;
mod frame;
mod packet;
mod sink;
mod source;
mod stream_id;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use packet::*;
pub use sink::*;
pub use source::{StreamCallback, StreamSource};
pub use stream_id::StreamId;
