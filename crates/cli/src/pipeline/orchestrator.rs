//! Pipeline orchestrator - coordinates all components.
//!
//! Sources feed the aligner from their own threads; this task owns the
//! consumer side: a non-blocking `try_get` poll loop with a sleep backoff,
//! which is also where the fault channel is drained and the overflow
//! policy applied.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    AlignMeta, AlignedCallback, AlignedFrame, PipelineBlueprint, StreamPacket, SyncError,
};
use ingestion::{Ingestion, MockStreamConfig, MockStreamSource};
use observability::record_aligned_tuple;
use sync_core::ExactAligner;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::PipelineStats;
use crate::cli::OverflowPolicy;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The pipeline blueprint
    pub blueprint: PipelineBlueprint,

    /// Maximum number of aligned tuples to emit (None = unlimited)
    pub max_tuples: Option<u64>,

    /// Pipeline deadline (None = run until max_tuples or a fault)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Recovery policy for lane overflow faults
    pub overflow_policy: OverflowPolicy,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Aligner
        let aligner_config = blueprint.aligner_config();
        info!(
            lanes = aligner_config.lane_count,
            watermark = aligner_config.capacity_watermark,
            "Configuring aligner"
        );
        let aligner: Arc<ExactAligner<StreamPacket>> = Arc::new(
            ExactAligner::new(aligner_config)
                .map_err(anyhow::Error::from)
                .context("Failed to construct aligner")?,
        );

        // Ingestion: one simulated source per configured stream
        let mut ingestion = Ingestion::new(Arc::clone(&aligner), 16);
        for stream in &blueprint.streams {
            let source = MockStreamSource::new(
                stream.id.clone(),
                MockStreamConfig {
                    tick_hz: blueprint.mock.tick_hz,
                    payload: stream.payload,
                    drop_rate: stream.drop_rate,
                    ..Default::default()
                },
            );
            ingestion
                .register_source(Box::new(source))
                .map_err(anyhow::Error::from)
                .with_context(|| format!("Failed to register stream '{}'", stream.id))?;
        }
        let active_streams = ingestion.stream_count();
        info!(active_streams, "Ingestion configured");

        // Dispatcher
        info!("Setting up dispatcher...");
        let (tuple_tx, tuple_rx) = mpsc::channel::<AlignedFrame>(64);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - aligned tuples only reach callbacks");
        }

        // The metrics recorder rides the callback registration path, the
        // same hook an embedding application would use for its own
        // per-tuple logic
        let callbacks: Vec<AlignedCallback> = vec![Arc::new(|frame: &AlignedFrame| {
            record_aligned_tuple(&frame.meta, frame.tuple_seq);
        })];

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), callbacks, tuple_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Start producing
        info!("Starting stream sources...");
        ingestion.start_all();
        let faults = ingestion
            .take_fault_receiver()
            .context("Fault receiver already taken")?;

        let poll_period = Duration::from_micros(blueprint.poll.period_us);
        let deadline = self.config.timeout.map(|t| start_time + t);
        let max_tuples = self.config.max_tuples;
        let overflow_policy = self.config.overflow_policy;
        let aligner_poll = Arc::clone(&aligner);

        info!(
            max_tuples = ?max_tuples,
            poll_period_us = blueprint.poll.period_us,
            "Pipeline running"
        );

        // Consumer poll loop
        let pipeline_task = async move {
            let mut stats = PipelineStats {
                active_streams,
                active_sinks,
                ..Default::default()
            };
            let mut abort: Option<String> = None;
            let mut tuple_seq = 0u64;

            'poll: loop {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        info!(tuples = tuple_seq, "Pipeline deadline reached");
                        break;
                    }
                }

                // Faults first: overflow policy decides whether the run survives
                while let Ok(fault) = faults.try_recv() {
                    match &fault.error {
                        SyncError::LaneOverflow { .. } => match overflow_policy {
                            OverflowPolicy::Reset => {
                                warn!(
                                    lane = fault.lane_index,
                                    stream = %fault.stream_id,
                                    error = %fault.error,
                                    "Lane overflow - resetting aligner"
                                );
                                aligner_poll.reset();
                                stats.resets += 1;
                            }
                            OverflowPolicy::Abort => {
                                error!(
                                    lane = fault.lane_index,
                                    stream = %fault.stream_id,
                                    error = %fault.error,
                                    "Lane overflow - aborting pipeline"
                                );
                                abort = Some(fault.error.to_string());
                                break 'poll;
                            }
                        },
                        other => {
                            // Anything else on the fault channel is a wiring bug
                            error!(
                                lane = fault.lane_index,
                                stream = %fault.stream_id,
                                error = %other,
                                "Fatal producer fault - aborting pipeline"
                            );
                            abort = Some(other.to_string());
                            break 'poll;
                        }
                    }
                }

                match aligner_poll.try_get() {
                    Some(packets) => {
                        tuple_seq += 1;
                        let timestamp = packets.first().map(|p| p.timestamp).unwrap_or_default();
                        let aligner_stats = aligner_poll.stats();
                        let frame = AlignedFrame {
                            timestamp,
                            tuple_seq,
                            packets,
                            meta: AlignMeta {
                                stragglers_dropped: aligner_stats.stragglers_dropped,
                                regressions: aligner_stats.regressions,
                                lane_depths: aligner_stats.lane_depths,
                            },
                        };

                        stats.align_metrics.update(&frame.meta, frame.timestamp);
                        stats.tuples_emitted = tuple_seq;

                        debug!(
                            tuple_seq,
                            timestamp,
                            lanes = frame.packets.len(),
                            "Aligned tuple produced"
                        );

                        if tuple_tx.send(frame).await.is_err() {
                            warn!("Dispatcher channel closed");
                            break;
                        }

                        if let Some(max) = max_tuples {
                            if tuple_seq >= max {
                                info!(tuples = tuple_seq, "Reached max tuples limit");
                                break;
                            }
                        }
                    }
                    // Nothing aligned yet: back off, the aligner never blocks
                    None => tokio::time::sleep(poll_period).await,
                }
            }

            let final_aligner = aligner_poll.stats();
            stats.stragglers_dropped = final_aligner.stragglers_dropped;
            stats.regressions = final_aligner.regressions;

            (stats, abort)
        };

        let (stats, abort) = pipeline_task.await;

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();

        // Wait for the dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        let mut final_stats = stats;
        final_stats.packets_received = ingestion.metrics().snapshot().packets_received;
        final_stats.duration = start_time.elapsed();

        info!(
            duration_secs = final_stats.duration.as_secs_f64(),
            tuples_per_sec = format!("{:.2}", final_stats.tuples_per_sec()),
            "Pipeline shutdown complete"
        );

        if let Some(reason) = abort {
            final_stats.print_summary();
            anyhow::bail!("pipeline aborted: {reason}");
        }

        Ok(final_stats)
    }
}
