//! Per-stream bounded FIFO with regression and overflow bookkeeping.

use std::collections::VecDeque;

use contracts::SyncError;
use metrics::counter;
use tracing::warn;

/// A single buffered message plus its alignment key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T> {
    /// Capture timestamp on the shared clock
    pub timestamp: u64,
    /// Per-stream monotonic sequence number
    pub sequence: u64,
    /// The message itself
    pub payload: T,
}

/// Per-stream bounded buffer of envelopes awaiting alignment.
///
/// The queue is insertion-ordered; producers are expected to deliver
/// non-decreasing timestamps, and a violation is recorded as a regression
/// without affecting queueing. Depth beyond the watermark means nothing is
/// draining the lane and surfaces as a `LaneOverflow` fault on the push
/// that crossed it.
#[derive(Debug)]
pub struct Lane<T> {
    index: usize,
    name: Option<String>,
    queue: VecDeque<Envelope<T>>,
    last_timestamp: u64,
    last_sequence: u64,
    has_received: bool,
    capacity_watermark: usize,
    regressions: u64,
}

impl<T> Lane<T> {
    pub(crate) fn new(index: usize, name: Option<String>, capacity_watermark: usize) -> Self {
        Self {
            index,
            name,
            queue: VecDeque::new(),
            last_timestamp: 0,
            last_sequence: 0,
            has_received: false,
            capacity_watermark,
            regressions: 0,
        }
    }

    /// Append an envelope.
    ///
    /// A timestamp older than the lane's previous one is a regression:
    /// warned and counted, but the envelope is still queued - alignment must
    /// stay robust to noisy sources. Returns `LaneOverflow` when the queue
    /// depth crosses the watermark; the envelope stays queued even then,
    /// since the fault reports breakage rather than shedding load.
    pub fn push(&mut self, timestamp: u64, sequence: u64, payload: T) -> Result<(), SyncError> {
        if self.has_received && timestamp < self.last_timestamp {
            self.regressions += 1;
            counter!("lockstep_ts_regressions_total", "lane" => self.metric_label()).increment(1);
            warn!(
                lane = self.index,
                name = self.name.as_deref().unwrap_or_default(),
                from = self.last_timestamp,
                to = timestamp,
                "timestamp regression detected"
            );
        }

        self.queue.push_back(Envelope {
            timestamp,
            sequence,
            payload,
        });
        self.has_received = true;
        self.last_timestamp = timestamp;
        self.last_sequence = sequence;

        if self.queue.len() > self.capacity_watermark {
            counter!("lockstep_lane_overflow_total", "lane" => self.metric_label()).increment(1);
            return Err(SyncError::LaneOverflow {
                lane: self.index,
                name: self.name.clone(),
                depth: self.queue.len(),
                watermark: self.capacity_watermark,
            });
        }

        Ok(())
    }

    /// Timestamp of the oldest buffered envelope, if any.
    pub fn front_timestamp(&self) -> Option<u64> {
        self.queue.front().map(|env| env.timestamp)
    }

    /// Remove and return the oldest envelope.
    pub fn pop_front(&mut self) -> Option<Envelope<T>> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Last timestamp accepted by this lane (0 until the first push).
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Last sequence number accepted by this lane (0 until the first push).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Regressions observed on this lane so far.
    pub fn regressions(&self) -> u64 {
        self.regressions
    }

    /// Diagnostic name, when one was configured.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Drop all buffered envelopes and forget the last-seen timestamp and
    /// sequence. The cumulative regression count is diagnostics and survives.
    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.last_timestamp = 0;
        self.last_sequence = 0;
        self.has_received = false;
    }

    fn metric_label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.index.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(watermark: usize) -> Lane<u32> {
        Lane::new(0, Some("cam".to_string()), watermark)
    }

    #[test]
    fn test_push_and_pop_preserve_order() {
        let mut lane = lane(10);
        lane.push(100, 1, 10).unwrap();
        lane.push(200, 2, 20).unwrap();

        assert_eq!(lane.front_timestamp(), Some(100));
        assert_eq!(lane.pop_front().unwrap().payload, 10);
        assert_eq!(lane.front_timestamp(), Some(200));
        assert_eq!(lane.pop_front().unwrap().payload, 20);
        assert!(lane.is_empty());
    }

    #[test]
    fn test_regression_is_counted_but_queued() {
        let mut lane = lane(10);
        lane.push(200, 1, 1).unwrap();
        lane.push(100, 2, 2).unwrap(); // older than the previous timestamp

        assert_eq!(lane.regressions(), 1);
        assert_eq!(lane.len(), 2);
        // Bookkeeping still follows the latest push
        assert_eq!(lane.last_timestamp(), 100);
        assert_eq!(lane.last_sequence(), 2);
    }

    #[test]
    fn test_first_timestamp_zero_is_not_a_regression() {
        let mut lane = lane(10);
        lane.push(0, 1, 1).unwrap();
        assert_eq!(lane.regressions(), 0);

        // But a later drop back to 0 is one
        lane.push(500, 2, 2).unwrap();
        lane.push(0, 3, 3).unwrap();
        assert_eq!(lane.regressions(), 1);
    }

    #[test]
    fn test_overflow_on_watermark_crossing_push_only() {
        let mut lane = lane(3);
        for seq in 0..3 {
            lane.push(seq * 100, seq, seq as u32).unwrap();
        }

        let err = lane.push(300, 3, 3).unwrap_err();
        match err {
            SyncError::LaneOverflow {
                lane: idx,
                name,
                depth,
                watermark,
            } => {
                assert_eq!(idx, 0);
                assert_eq!(name.as_deref(), Some("cam"));
                assert_eq!(depth, 4);
                assert_eq!(watermark, 3);
            }
            other => panic!("expected LaneOverflow, got {other:?}"),
        }
        // The overflowing envelope is still buffered
        assert_eq!(lane.len(), 4);
    }

    #[test]
    fn test_clear_resets_bookkeeping() {
        let mut lane = lane(10);
        lane.push(100, 5, 1).unwrap();
        lane.clear();

        assert!(lane.is_empty());
        assert_eq!(lane.last_timestamp(), 0);
        assert_eq!(lane.last_sequence(), 0);
        // After clear, an initial low timestamp is not a regression
        lane.push(10, 1, 1).unwrap();
        assert_eq!(lane.regressions(), 0);
    }
}
