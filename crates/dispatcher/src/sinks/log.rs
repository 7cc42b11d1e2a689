//! LogSink - logs tuple summary via tracing

use contracts::{AlignedFrame, FrameSink, SyncError};
use tracing::{info, instrument};

/// Sink that logs tuple summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_tuple_summary(&self, frame: &AlignedFrame) {
        let payload_bytes: usize = frame
            .packets
            .iter()
            .map(|p| p.payload.byte_len())
            .sum();

        info!(
            sink = %self.name,
            tuple_seq = frame.tuple_seq,
            timestamp = frame.timestamp,
            lanes = frame.packets.len(),
            payload_bytes,
            stragglers_dropped = frame.meta.stragglers_dropped,
            "aligned tuple received"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, tuple_seq = frame.tuple_seq)
    )]
    async fn write(&mut self, frame: &AlignedFrame) -> Result<(), SyncError> {
        self.log_tuple_summary(frame);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SyncError> {
        // Nothing to flush for log sink
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SyncError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
