//! StreamBridge - one source, one lane
//!
//! The bridge registers a callback on its source that feeds the aligner
//! directly from the producer context. `add_message` never blocks, so the
//! callback is safe to run on a latency-sensitive delivery thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{StreamCallback, StreamId, StreamPacket, StreamSource, SyncError};
use metrics::counter;
use sync_core::ExactAligner;
use tracing::{debug, error, info, instrument, warn};

/// A fault raised on a producer path, forwarded to the pipeline supervisor.
///
/// Lane overflow means synchronization is broken for this stream and will
/// not self-heal; the supervisor decides between resetting the aligner,
/// alerting, or shutting the pipeline down.
#[derive(Debug)]
pub struct FaultEvent {
    pub lane_index: usize,
    pub stream_id: StreamId,
    pub error: SyncError,
}

/// Binds one `StreamSource` to one aligner lane
pub struct StreamBridge {
    lane_index: usize,
    source: Box<dyn StreamSource>,
    listening: Arc<AtomicBool>,
}

impl StreamBridge {
    pub fn new(lane_index: usize, source: Box<dyn StreamSource>) -> Self {
        Self {
            lane_index,
            source,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stream_id(&self) -> &str {
        self.source.stream_id()
    }

    pub fn lane_index(&self) -> usize {
        self.lane_index
    }

    /// Register the feeding callback on the source.
    ///
    /// Idempotent: a second call while listening does nothing.
    #[instrument(
        name = "bridge_start",
        skip(self, aligner, faults, ingest),
        fields(lane = self.lane_index, stream = %self.source.stream_id())
    )]
    pub fn start(
        &self,
        aligner: Arc<ExactAligner<StreamPacket>>,
        faults: Sender<FaultEvent>,
        ingest: Arc<super::IngestMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let lane_index = self.lane_index;
        let listening = self.listening.clone();

        debug!("starting stream bridge");

        let callback: StreamCallback = Arc::new(move |packet| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            ingest.record_received();
            counter!("lockstep_packets_received_total", "stream" => packet.stream_id.to_string())
                .increment(1);

            let (timestamp, sequence) = (packet.timestamp, packet.sequence);
            let stream_id = packet.stream_id.clone();

            if let Err(err) = aligner.add_message(lane_index, timestamp, sequence, packet) {
                ingest.record_fault();
                error!(
                    lane = lane_index,
                    stream = %stream_id,
                    error = %err,
                    "message rejected by aligner"
                );
                // Never block the producer: if the supervisor is not keeping
                // up with faults the first one already told the story
                if let Err(TrySendError::Closed(_)) = faults.try_send(FaultEvent {
                    lane_index,
                    stream_id,
                    error: err,
                }) {
                    warn!(lane = lane_index, "fault channel closed, fault dropped");
                }
            }
        });

        self.source.listen(callback);
    }

    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(
                lane = self.lane_index,
                stream = %self.source.stream_id(),
                "stopping stream bridge"
            );
            self.source.stop();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// Bridge registry for one pipeline
///
/// Owns the aligner handle, the fault channel and all bridges. Sources are
/// assigned lanes in registration order.
pub struct Ingestion {
    aligner: Arc<ExactAligner<StreamPacket>>,
    bridges: Vec<StreamBridge>,
    metrics: Arc<super::IngestMetrics>,
    fault_tx: Sender<FaultEvent>,
    fault_rx: Option<Receiver<FaultEvent>>,
}

impl Ingestion {
    /// Create a registry over an aligner.
    ///
    /// `fault_capacity` bounds the supervisor channel; producers drop
    /// faults rather than block when it fills.
    pub fn new(aligner: Arc<ExactAligner<StreamPacket>>, fault_capacity: usize) -> Self {
        let (fault_tx, fault_rx) = bounded(fault_capacity);
        Self {
            aligner,
            bridges: Vec::new(),
            metrics: Arc::new(super::IngestMetrics::new()),
            fault_tx,
            fault_rx: Some(fault_rx),
        }
    }

    /// Register a source on the next free lane and return its lane index.
    ///
    /// # Errors
    /// `LaneOutOfRange` when every lane already has a source.
    pub fn register_source(&mut self, source: Box<dyn StreamSource>) -> Result<usize, SyncError> {
        let lane_index = self.bridges.len();
        if lane_index >= self.aligner.lane_count() {
            return Err(SyncError::LaneOutOfRange {
                index: lane_index,
                lane_count: self.aligner.lane_count(),
            });
        }

        debug!(lane = lane_index, stream = %source.stream_id(), "registered stream source");
        self.bridges.push(StreamBridge::new(lane_index, source));
        Ok(lane_index)
    }

    /// Start every registered bridge
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.bridges.len(), "starting all stream bridges");
        for bridge in &self.bridges {
            bridge.start(
                Arc::clone(&self.aligner),
                self.fault_tx.clone(),
                Arc::clone(&self.metrics),
            );
        }
    }

    /// Stop every bridge
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.bridges.len(), "stopping all stream bridges");
        for bridge in &self.bridges {
            bridge.stop();
        }
    }

    /// Take the fault receiver
    ///
    /// Note: can only be called once, subsequent calls return None
    pub fn take_fault_receiver(&mut self) -> Option<Receiver<FaultEvent>> {
        self.fault_rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<super::IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of registered sources
    pub fn stream_count(&self) -> usize {
        self.bridges.len()
    }
}

impl Drop for Ingestion {
    fn drop(&mut self) {
        self.stop_all();
    }
}
