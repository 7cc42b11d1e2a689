//! Sink implementations
//!
//! Contains LogSink and JsonlSink.

mod jsonl;
mod log;

pub use self::jsonl::JsonlSink;
pub use self::log::LogSink;
