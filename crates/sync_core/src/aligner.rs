//! Exact-match alignment across N lanes.
//!
//! The aligner assumes streams are co-timestamped (triggered from a shared
//! clock), so persistent skew between two lanes means the lagging lane lost
//! or delayed a frame. Stragglers are therefore discarded rather than held:
//! buffering a lagging lane indefinitely risks unbounded memory growth and
//! unbounded output latency. The cost is that a stream with a systematic
//! timestamp offset never aligns and is perpetually drained; the lane
//! overflow fault is the diagnostic for that condition.
//!
//! `try_get` is deliberately two-phase: a call either performs one straggler
//! cleanup pass and reports no result, or pops an aligned tuple, never both.
//! Each call's critical section stays O(lane count + drops) and the caller
//! polls until the lanes settle. Looping to convergence inside the lock was
//! rejected to keep worst-case per-call latency bounded.

use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use contracts::{AlignerConfig, AlignerStats, SyncError};

use crate::lane::Lane;

struct AlignerInner<T> {
    lanes: Vec<Lane<T>>,
    tuples_emitted: u64,
    stragglers_dropped: u64,
}

/// Thread-safe exact-match synchronizer over a fixed set of lanes.
///
/// All lane state lives behind a single mutex: `try_get` has to compare the
/// front of every lane in one consistent snapshot, which per-lane locking
/// cannot provide without ordering gymnastics. Producers calling
/// [`add_message`](Self::add_message) and consumers calling
/// [`try_get`](Self::try_get) therefore serialize on one short critical
/// section; no call blocks waiting for data or space.
pub struct ExactAligner<T> {
    inner: Mutex<AlignerInner<T>>,
    lane_count: usize,
}

impl<T> std::fmt::Debug for ExactAligner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactAligner")
            .field("lane_count", &self.lane_count)
            .finish_non_exhaustive()
    }
}

impl<T> ExactAligner<T> {
    /// Allocate `config.lane_count` empty lanes.
    ///
    /// # Errors
    /// `InvalidConfiguration` when the lane count is zero or `lane_names`
    /// is present with a mismatched length.
    pub fn new(config: AlignerConfig) -> Result<Self, SyncError> {
        let AlignerConfig {
            lane_count,
            lane_names,
            capacity_watermark,
        } = config;

        if lane_count == 0 {
            return Err(SyncError::invalid_configuration("lane count must be nonzero"));
        }
        if let Some(ref names) = lane_names {
            if names.len() != lane_count {
                return Err(SyncError::invalid_configuration(format!(
                    "{} lane names provided for {} lanes",
                    names.len(),
                    lane_count
                )));
            }
        }

        let lanes = (0..lane_count)
            .map(|index| {
                let name = lane_names.as_ref().map(|names| names[index].clone());
                Lane::new(index, name, capacity_watermark)
            })
            .collect();

        Ok(Self {
            inner: Mutex::new(AlignerInner {
                lanes,
                tuples_emitted: 0,
                stragglers_dropped: 0,
            }),
            lane_count,
        })
    }

    /// Number of lanes, fixed at construction.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Queue one message onto a lane.
    ///
    /// # Errors
    /// - `LaneOutOfRange` when `lane_index >= lane_count` - a caller bug,
    ///   surfaced immediately.
    /// - `LaneOverflow` when this push leaves the lane deeper than its
    ///   watermark. Fatal for the affected stream's producer path: nothing
    ///   is draining the lane and the condition does not self-heal. Whether
    ///   that kills the whole pipeline or just this source is the caller's
    ///   policy; [`reset`](Self::reset) is the recommended recovery.
    #[instrument(level = "trace", name = "aligner_add_message", skip(self, payload))]
    pub fn add_message(
        &self,
        lane_index: usize,
        timestamp: u64,
        sequence: u64,
        payload: T,
    ) -> Result<(), SyncError> {
        if lane_index >= self.lane_count {
            return Err(SyncError::LaneOutOfRange {
                index: lane_index,
                lane_count: self.lane_count,
            });
        }

        let mut inner = self.inner.lock();
        inner.lanes[lane_index].push(timestamp, sequence, payload)
    }

    /// Poll for an aligned tuple.
    ///
    /// Returns `Some` only when every lane's front carries one identical
    /// timestamp; the payloads come back in lane-index order and exactly one
    /// envelope leaves every lane. When fronts disagree, one cleanup pass
    /// discards every front strictly older than the newest front and the
    /// call returns `None` - poll again to learn whether the lanes now
    /// agree. An empty lane also returns `None`; that is the common idle
    /// case, not an error.
    #[instrument(level = "trace", name = "aligner_try_get", skip(self))]
    pub fn try_get(&self) -> Option<Vec<T>> {
        let mut inner = self.inner.lock();

        let mut min_ts = u64::MAX;
        let mut max_ts = u64::MIN;
        for lane in &inner.lanes {
            // Some lanes are empty: nothing to compare yet
            let ts = lane.front_timestamp()?;
            min_ts = min_ts.min(ts);
            max_ts = max_ts.max(ts);
        }

        if min_ts != max_ts {
            let mut dropped = 0u64;
            for lane in &mut inner.lanes {
                while lane.front_timestamp().is_some_and(|ts| ts < max_ts) {
                    lane.pop_front();
                    dropped += 1;
                }
            }
            inner.stragglers_dropped += dropped;
            counter!("lockstep_stragglers_dropped_total").increment(dropped);
            debug!(min_ts, max_ts, dropped, "lane fronts disagree, dropped stragglers");
            return None;
        }

        let mut tuple = Vec::with_capacity(self.lane_count);
        for lane in &mut inner.lanes {
            // Non-empty: every lane contributed to the min/max scan above
            let envelope = lane.pop_front()?;
            tuple.push(envelope.payload);
        }
        inner.tuples_emitted += 1;
        counter!("lockstep_tuples_total").increment(1);
        trace!(timestamp = max_ts, "aligned tuple emitted");

        Some(tuple)
    }

    /// Discard everything buffered and forget per-lane last-seen state.
    ///
    /// The recommended response to a `LaneOverflow`: stale, misaligned
    /// envelopes may remain across several lanes, so partial recovery is
    /// not attempted.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        for lane in &mut inner.lanes {
            lane.clear();
        }
        debug!("aligner reset, all lanes cleared");
    }

    /// Snapshot of depths and cumulative counters, for diagnostics.
    pub fn stats(&self) -> AlignerStats {
        let inner = self.inner.lock();
        AlignerStats {
            lane_depths: inner.lanes.iter().map(Lane::len).collect(),
            tuples_emitted: inner.tuples_emitted,
            stragglers_dropped: inner.stragglers_dropped,
            regressions: inner.lanes.iter().map(Lane::regressions).sum(),
        }
    }
}
