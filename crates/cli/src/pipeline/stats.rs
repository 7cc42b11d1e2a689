//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::AlignMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total aligned tuples emitted
    pub tuples_emitted: u64,

    /// Total stragglers discarded by cleanup passes
    pub stragglers_dropped: u64,

    /// Total timestamp regressions observed
    pub regressions: u64,

    /// Total packets received from sources
    pub packets_received: u64,

    /// Aligner resets performed after overflow faults
    pub resets: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of streams that were active
    pub active_streams: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Alignment metrics aggregator
    pub align_metrics: AlignMetricsAggregator,
}

impl PipelineStats {
    /// Aligned tuples per second
    pub fn tuples_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.tuples_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Tuples emitted: {}", self.tuples_emitted);
        println!("  Packets received: {}", self.packets_received);
        println!("  Tuples/s: {:.2}", self.tuples_per_sec());
        println!("  Active streams: {}", self.active_streams);
        println!("  Active sinks: {}", self.active_sinks);
        if self.resets > 0 {
            println!("  Aligner resets after overflow: {}", self.resets);
        }

        let summary = self.align_metrics.summary();

        println!("\nAligner Metrics");
        println!(
            "  Stragglers dropped: {} ({:.3} per tuple)",
            summary.stragglers_dropped, summary.stragglers_per_tuple
        );
        println!("  Timestamp regressions: {}", summary.regressions);
        println!("  Lane depth: {}", summary.lane_depth);
        println!("  Tuple interval (ms): {}", summary.tuple_interval_ms);

        println!();
    }
}
