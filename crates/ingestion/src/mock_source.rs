//! Simulated stream source
//!
//! Implements `StreamSource`, generating payloads from a background thread.
//! Timestamps come from a tick counter, not a wall clock: every simulated
//! stream configured with the same `tick_hz` stamps tick `k` with the same
//! nanosecond value, so co-delivered frames align exactly - the behavior of
//! hardware triggered from a shared capture clock. A configurable drop rate
//! skips ticks to exercise straggler cleanup downstream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    FramePayload, ImageEncoding, ImageFrame, ImuSample, PayloadKind, StreamCallback, StreamPacket,
    StreamSource, Vector3,
};
use tracing::{debug, trace};

/// Simulated source configuration
#[derive(Debug, Clone)]
pub struct MockStreamConfig {
    /// Tick frequency (Hz); shared across streams for exact alignment
    pub tick_hz: f64,
    /// Payload kind to generate
    pub payload: PayloadKind,
    /// Fraction of ticks to skip, deterministically per tick
    pub drop_rate: f64,
    /// Image width (image payloads only)
    pub image_width: u32,
    /// Image height (image payloads only)
    pub image_height: u32,
}

impl Default for MockStreamConfig {
    fn default() -> Self {
        Self {
            tick_hz: 20.0,
            payload: PayloadKind::Image,
            drop_rate: 0.0,
            image_width: 64,
            image_height: 48,
        }
    }
}

/// Simulated stream source
///
/// Generates packets at the configured tick rate on a background thread and
/// delivers them through the registered callback, matching the delivery
/// model of a middleware subscription.
pub struct MockStreamSource {
    stream_id: String,
    config: MockStreamConfig,
    listening: Arc<AtomicBool>,
}

impl MockStreamSource {
    pub fn new(stream_id: String, config: MockStreamConfig) -> Self {
        Self {
            stream_id,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_defaults(stream_id: String) -> Self {
        Self::new(stream_id, MockStreamConfig::default())
    }

    /// Deterministic per-tick drop decision, identical across runs
    fn should_drop(tick: u64, drop_rate: f64) -> bool {
        if drop_rate <= 0.0 {
            return false;
        }
        let hashed = tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (hashed >> 33) % 1000 < (drop_rate * 1000.0) as u64
    }

    fn generate_payload(config: &MockStreamConfig, tick: u64) -> FramePayload {
        match config.payload {
            PayloadKind::Image => {
                let size = (config.image_width * config.image_height) as usize;
                FramePayload::Image(ImageFrame {
                    width: config.image_width,
                    height: config.image_height,
                    encoding: ImageEncoding::Mono8,
                    exposure_us: 5_000,
                    gain: 1,
                    data: Bytes::from(vec![(tick % 256) as u8; size]),
                })
            }
            PayloadKind::Imu => FramePayload::Imu(ImuSample {
                accelerometer: Vector3 {
                    x: 0.0,
                    y: 0.0,
                    z: 9.81,
                },
                gyroscope: Vector3::default(),
            }),
            PayloadKind::Raw => FramePayload::Raw(Bytes::from(tick.to_le_bytes().to_vec())),
        }
    }
}

impl StreamSource for MockStreamSource {
    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn listen(&self, callback: StreamCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let stream_id = self.stream_id.clone();
        let config = self.config.clone();
        let listening = self.listening.clone();

        let interval = Duration::from_secs_f64(1.0 / config.tick_hz);
        let period_ns = interval.as_nanos() as u64;

        thread::spawn(move || {
            let mut tick: u64 = 0;
            let mut sequence: u64 = 0;

            debug!(
                stream = %stream_id,
                tick_hz = config.tick_hz,
                drop_rate = config.drop_rate,
                "mock stream started"
            );

            while listening.load(Ordering::Relaxed) {
                tick += 1;
                let timestamp = tick * period_ns;

                if Self::should_drop(tick, config.drop_rate) {
                    trace!(stream = %stream_id, tick, "mock frame skipped");
                } else {
                    sequence += 1;
                    callback(StreamPacket {
                        stream_id: stream_id.clone().into(),
                        timestamp,
                        sequence,
                        payload: Self::generate_payload(&config, tick),
                    });
                    trace!(stream = %stream_id, tick, timestamp, "mock frame sent");
                }

                thread::sleep(interval);
            }

            debug!(stream = %stream_id, "mock stream stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    #[test]
    fn test_mock_source_emits_tick_timestamps() {
        let source = MockStreamSource::new(
            "cam".to_string(),
            MockStreamConfig {
                tick_hz: 200.0,
                ..Default::default()
            },
        );

        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);

        source.listen(Arc::new(move |packet| {
            assert_eq!(packet.stream_id, "cam");
            seen_cb.lock().unwrap().push(packet.timestamp);
        }));

        thread::sleep(Duration::from_millis(100));
        source.stop();
        assert!(!source.is_listening());

        let seen = seen.lock().unwrap();
        assert!(seen.len() > 2);
        // Ticks at 200 Hz are 5ms apart
        let period = 5_000_000u64;
        for (i, ts) in seen.iter().enumerate() {
            assert_eq!(*ts, (i as u64 + 1) * period);
        }
    }

    #[test]
    fn test_two_sources_share_timestamps() {
        // Same tick_hz means tick k has the same stamp on both streams
        let config = MockStreamConfig {
            tick_hz: 500.0,
            payload: PayloadKind::Raw,
            ..Default::default()
        };
        let a = MockStreamSource::new("a".to_string(), config.clone());
        let b = MockStreamSource::new("b".to_string(), config);

        let first_a: Arc<AtomicU64> = Arc::new(AtomicU64::new(0));
        let first_b: Arc<AtomicU64> = Arc::new(AtomicU64::new(0));

        let fa = Arc::clone(&first_a);
        a.listen(Arc::new(move |p| {
            fa.compare_exchange(0, p.timestamp, Ordering::SeqCst, Ordering::SeqCst)
                .ok();
        }));
        let fb = Arc::clone(&first_b);
        b.listen(Arc::new(move |p| {
            fb.compare_exchange(0, p.timestamp, Ordering::SeqCst, Ordering::SeqCst)
                .ok();
        }));

        thread::sleep(Duration::from_millis(50));
        a.stop();
        b.stop();

        let (ts_a, ts_b) = (
            first_a.load(Ordering::SeqCst),
            first_b.load(Ordering::SeqCst),
        );
        assert_ne!(ts_a, 0);
        assert_eq!(ts_a, ts_b);
    }

    #[test]
    fn test_drop_rate_skips_some_ticks() {
        let mut dropped = 0;
        for tick in 0..10_000 {
            if MockStreamSource::should_drop(tick, 0.2) {
                dropped += 1;
            }
        }
        // Roughly a fifth, and deterministic
        assert!((1_000..3_000).contains(&dropped));
        assert_eq!(
            MockStreamSource::should_drop(42, 0.2),
            MockStreamSource::should_drop(42, 0.2)
        );
    }

    #[test]
    fn test_idempotent_listen() {
        let source = MockStreamSource::with_defaults("once".to_string());

        let count = Arc::new(AtomicU64::new(0));
        let c1 = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            c1.fetch_add(1, Ordering::Relaxed);
        }));

        // Second callback must not be registered
        let c2 = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            c2.fetch_add(1_000, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(120));
        source.stop();

        let final_count = count.load(Ordering::Relaxed);
        assert!(final_count > 0);
        assert!(final_count < 1_000);
    }
}
