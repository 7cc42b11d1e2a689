//! # Integration Tests
//!
//! Cross-crate and end-to-end tests for the alignment pipeline, all running
//! against simulated sources (no external middleware required).

#[cfg(test)]
mod contract_tests {
    use contracts::{StreamId, SyncError};

    #[test]
    fn test_error_messages_are_actionable() {
        let err = SyncError::LaneOverflow {
            lane: 1,
            name: Some("cam_rear".to_string()),
            depth: 51,
            watermark: 50,
        };
        assert!(err.to_string().contains("cam_rear"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stream_id_round_trip() {
        let id: StreamId = "cam_front".into();
        assert_eq!(id.as_str(), "cam_front");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{
        AlignMeta, AlignedCallback, AlignedFrame, AlignerConfig, PayloadKind, StreamPacket,
        SyncError,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{Ingestion, MockStreamConfig, MockStreamSource};
    use sync_core::ExactAligner;
    use tokio::sync::mpsc;

    fn mock_source(id: &str, tick_hz: f64, drop_rate: f64) -> Box<MockStreamSource> {
        Box::new(MockStreamSource::new(
            id.to_string(),
            MockStreamConfig {
                tick_hz,
                payload: PayloadKind::Raw,
                drop_rate,
                ..Default::default()
            },
        ))
    }

    /// Poll the aligner until `target` tuples were collected or the
    /// deadline passes.
    fn poll_tuples(
        aligner: &ExactAligner<StreamPacket>,
        target: usize,
        deadline: Duration,
    ) -> Vec<Vec<StreamPacket>> {
        let start = Instant::now();
        let mut tuples = Vec::new();
        while tuples.len() < target && start.elapsed() < deadline {
            match aligner.try_get() {
                Some(tuple) => tuples.push(tuple),
                None => std::thread::sleep(Duration::from_micros(500)),
            }
        }
        tuples
    }

    /// End-to-end: MockStreamSource -> Ingestion -> ExactAligner -> poll loop.
    ///
    /// Every emitted tuple must carry one identical timestamp and keep lane
    /// order, regardless of delivery interleaving.
    #[test]
    fn test_e2e_alignment_over_mock_streams() {
        let aligner = Arc::new(
            ExactAligner::new(AlignerConfig::named(vec![
                "cam_front".to_string(),
                "cam_rear".to_string(),
                "imu0".to_string(),
            ]))
            .unwrap(),
        );

        let mut ingestion = Ingestion::new(Arc::clone(&aligner), 8);
        for id in ["cam_front", "cam_rear", "imu0"] {
            ingestion.register_source(mock_source(id, 500.0, 0.0)).unwrap();
        }
        ingestion.start_all();

        let tuples = poll_tuples(&aligner, 10, Duration::from_secs(5));
        ingestion.stop_all();

        assert!(tuples.len() >= 10, "expected 10 tuples, got {}", tuples.len());
        for tuple in &tuples {
            assert_eq!(tuple.len(), 3);
            assert_eq!(tuple[0].stream_id, "cam_front");
            assert_eq!(tuple[1].stream_id, "cam_rear");
            assert_eq!(tuple[2].stream_id, "imu0");
            assert!(tuple.iter().all(|p| p.timestamp == tuple[0].timestamp));
        }

        assert!(ingestion.metrics().snapshot().packets_received >= 30);
    }

    /// A lossy stream forces straggler cleanup but never produces a
    /// mis-timestamped tuple.
    #[test]
    fn test_e2e_lossy_stream_drops_stragglers_not_alignment() {
        let aligner = Arc::new(
            ExactAligner::new(AlignerConfig::with_lane_count(2).watermark(200)).unwrap(),
        );

        let mut ingestion = Ingestion::new(Arc::clone(&aligner), 8);
        ingestion
            .register_source(mock_source("steady", 500.0, 0.0))
            .unwrap();
        ingestion
            .register_source(mock_source("lossy", 500.0, 0.3))
            .unwrap();
        ingestion.start_all();

        let tuples = poll_tuples(&aligner, 20, Duration::from_secs(10));
        ingestion.stop_all();

        assert!(tuples.len() >= 20);
        for tuple in &tuples {
            assert_eq!(tuple[0].timestamp, tuple[1].timestamp);
        }
        // The steady stream's frames for skipped ticks had to be discarded
        assert!(aligner.stats().stragglers_dropped > 0);
    }

    /// Overflow surfaces on the fault channel, and a reset recovers the
    /// aligner for continued use.
    #[test]
    fn test_e2e_overflow_fault_and_reset_recovery() {
        let config = AlignerConfig::with_lane_count(2).watermark(5);
        let aligner = Arc::new(ExactAligner::<StreamPacket>::new(config).unwrap());

        let mut ingestion = Ingestion::new(Arc::clone(&aligner), 8);
        // Only one lane gets a source: nothing can ever align, so the lane
        // fills to its watermark
        ingestion
            .register_source(mock_source("unpaired", 1000.0, 0.0))
            .unwrap();

        let faults = ingestion.take_fault_receiver().unwrap();
        ingestion.start_all();

        let fault = faults.recv_blocking().unwrap();
        assert!(matches!(fault.error, SyncError::LaneOverflow { .. }));
        assert_eq!(fault.lane_index, 0);

        ingestion.stop_all();
        // Let the producer thread observe the stop flag before resetting
        std::thread::sleep(Duration::from_millis(20));

        // Recommended recovery: wholesale reset
        aligner.reset();
        let stats = aligner.stats();
        assert!(stats.lane_depths.iter().all(|&d| d == 0));

        // The aligner still works after the reset
        aligner
            .add_message(0, 42, 1, placeholder_packet("unpaired", 42))
            .unwrap();
        assert_eq!(aligner.stats().lane_depths[0], 1);
    }

    /// Blueprint loaded from TOML drives the whole pipeline, dispatcher
    /// included.
    #[tokio::test]
    async fn test_e2e_blueprint_to_dispatcher() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
[[streams]]
id = "left"
payload = "raw"

[[streams]]
id = "right"
payload = "raw"

[mock]
tick_hz = 500.0

[[sinks]]
name = "log"
sink_type = "log"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let aligner = Arc::new(ExactAligner::new(blueprint.aligner_config()).unwrap());
        let mut ingestion = Ingestion::new(Arc::clone(&aligner), 8);
        for stream in &blueprint.streams {
            ingestion
                .register_source(Box::new(MockStreamSource::new(
                    stream.id.clone(),
                    MockStreamConfig {
                        tick_hz: blueprint.mock.tick_hz,
                        payload: stream.payload,
                        drop_rate: stream.drop_rate,
                        ..Default::default()
                    },
                )))
                .unwrap();
        }

        let (tuple_tx, tuple_rx) = mpsc::channel::<AlignedFrame>(16);
        let callback_count = Arc::new(AtomicU64::new(0));
        let counted = Arc::clone(&callback_count);
        let callbacks: Vec<AlignedCallback> = vec![Arc::new(move |frame| {
            assert!(frame.packets.iter().all(|p| p.timestamp == frame.timestamp));
            counted.fetch_add(1, Ordering::Relaxed);
        })];

        let dispatcher = create_dispatcher(blueprint.sinks.clone(), callbacks, tuple_rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        ingestion.start_all();

        // Consumer loop: poll, wrap, forward
        let mut tuple_seq = 0u64;
        let deadline = Instant::now() + Duration::from_secs(5);
        while tuple_seq < 5 && Instant::now() < deadline {
            match aligner.try_get() {
                Some(packets) => {
                    tuple_seq += 1;
                    let timestamp = packets[0].timestamp;
                    let stats = aligner.stats();
                    tuple_tx
                        .send(AlignedFrame {
                            timestamp,
                            tuple_seq,
                            packets,
                            meta: AlignMeta {
                                stragglers_dropped: stats.stragglers_dropped,
                                regressions: stats.regressions,
                                lane_depths: stats.lane_depths,
                            },
                        })
                        .await
                        .unwrap();
                }
                None => tokio::time::sleep(Duration::from_micros(500)).await,
            }
        }

        ingestion.stop_all();
        drop(tuple_tx);
        dispatcher_handle.await.unwrap();

        assert_eq!(tuple_seq, 5);
        assert_eq!(callback_count.load(Ordering::Relaxed), 5);
    }

    /// The end-of-run aggregator folds tuple metadata without drift.
    #[test]
    fn test_aggregator_matches_aligner_counters() {
        let mut aggregator = observability::AlignMetricsAggregator::new();
        let aligner: ExactAligner<u32> =
            ExactAligner::new(AlignerConfig::with_lane_count(2)).unwrap();

        for tick in 1..=5u64 {
            aligner.add_message(0, tick * 100, tick, 0).unwrap();
            aligner.add_message(1, tick * 100, tick, 1).unwrap();
            let tuple = aligner.try_get().unwrap();
            assert_eq!(tuple.len(), 2);

            let stats = aligner.stats();
            aggregator.update(
                &AlignMeta {
                    stragglers_dropped: stats.stragglers_dropped,
                    regressions: stats.regressions,
                    lane_depths: stats.lane_depths,
                },
                tick * 100,
            );
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_tuples, 5);
        assert_eq!(summary.stragglers_dropped, 0);
        assert_eq!(summary.tuple_interval_ms.count, 4);
    }

    fn placeholder_packet(id: &str, timestamp: u64) -> StreamPacket {
        StreamPacket {
            stream_id: id.into(),
            timestamp,
            sequence: 1,
            payload: contracts::FramePayload::Raw(bytes::Bytes::new()),
        }
    }
}
