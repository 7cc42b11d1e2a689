//! Shared ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by all bridges of one pipeline
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Total packets received from all sources
    packets_received: AtomicU64,

    /// Total faults raised by `add_message`
    faults_raised: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            faults_raised: self.faults_raised.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestSnapshot {
    pub packets_received: u64,
    pub faults_raised: u64,
}
