//! JsonlSink - appends one JSON record per tuple to a file
//!
//! Records carry the alignment metadata and per-packet summaries, not the
//! payloads themselves; this is a diagnostics trail, not a recorder.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{AlignMeta, AlignedFrame, FrameSink, SyncError};
use serde::Serialize;
use tracing::{debug, instrument};

/// Configuration for JsonlSink
#[derive(Debug, Clone)]
pub struct JsonlSinkConfig {
    /// Output file path
    pub path: PathBuf,
}

impl JsonlSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./tuples.jsonl"));

        Self { path }
    }
}

/// One line of output
#[derive(Serialize)]
struct TupleRecord<'a> {
    tuple_seq: u64,
    timestamp: u64,
    streams: Vec<&'a str>,
    sequences: Vec<u64>,
    payload_bytes: Vec<usize>,
    meta: &'a AlignMeta,
}

/// Sink that appends tuple records to a JSONL file
pub struct JsonlSink {
    name: String,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Create a new JsonlSink, truncating any existing file
    pub fn new(name: impl Into<String>, config: JsonlSinkConfig) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            writer: BufWriter::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, JsonlSinkConfig::from_params(params))
    }

    fn append_record(&mut self, frame: &AlignedFrame) -> Result<(), SyncError> {
        let record = TupleRecord {
            tuple_seq: frame.tuple_seq,
            timestamp: frame.timestamp,
            streams: frame.packets.iter().map(|p| p.stream_id.as_str()).collect(),
            sequences: frame.packets.iter().map(|p| p.sequence).collect(),
            payload_bytes: frame.packets.iter().map(|p| p.payload.byte_len()).collect(),
            meta: &frame.meta,
        };

        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| SyncError::sink_write(&self.name, e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| SyncError::sink_write(&self.name, e.to_string()))?;
        Ok(())
    }
}

impl FrameSink for JsonlSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "jsonl_sink_write",
        skip(self, frame),
        fields(sink = %self.name, tuple_seq = frame.tuple_seq)
    )]
    async fn write(&mut self, frame: &AlignedFrame) -> Result<(), SyncError> {
        self.append_record(frame)
    }

    async fn flush(&mut self) -> Result<(), SyncError> {
        self.writer
            .flush()
            .map_err(|e| SyncError::sink_write(&self.name, e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SyncError> {
        self.writer
            .flush()
            .map_err(|e| SyncError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "JsonlSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{FramePayload, StreamPacket};
    use tempfile::tempdir;

    fn frame(tuple_seq: u64, timestamp: u64) -> AlignedFrame {
        let packets = ["left", "right"]
            .iter()
            .map(|id| StreamPacket {
                stream_id: (*id).into(),
                timestamp,
                sequence: tuple_seq,
                payload: FramePayload::Raw(Bytes::from_static(b"xyz")),
            })
            .collect();

        AlignedFrame {
            timestamp,
            tuple_seq,
            packets,
            meta: AlignMeta::default(),
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_one_line_per_tuple() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tuples.jsonl");
        let config = JsonlSinkConfig { path: path.clone() };

        let mut sink = JsonlSink::new("test_jsonl", config).unwrap();
        sink.write(&frame(1, 1_000)).await.unwrap();
        sink.write(&frame(2, 2_000)).await.unwrap();
        sink.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["tuple_seq"], 1);
        assert_eq!(first["timestamp"], 1_000);
        assert_eq!(first["streams"][0], "left");
        assert_eq!(first["payload_bytes"][1], 3);
    }

    #[test]
    fn test_config_from_params_defaults() {
        let config = JsonlSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.path, PathBuf::from("./tuples.jsonl"));

        let mut params = HashMap::new();
        params.insert("path".to_string(), "/tmp/out.jsonl".to_string());
        let config = JsonlSinkConfig::from_params(&params);
        assert_eq!(config.path, PathBuf::from("/tmp/out.jsonl"));
    }
}
