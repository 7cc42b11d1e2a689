//! Dispatcher - main loop: callbacks first, then fan-out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{AlignedCallback, AlignedFrame, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{JsonlSink, LogSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<AlignedFrame>,
    callbacks: Vec<AlignedCallback>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<AlignedFrame>) -> Self {
        Self {
            config,
            input_rx,
            callbacks: Vec::new(),
        }
    }

    /// Register a per-tuple callback.
    ///
    /// Callbacks run on the dispatcher task in registration order, before
    /// sink fan-out, and must be non-blocking.
    pub fn register_callback(mut self, callback: AlignedCallback) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;

        Ok(Dispatcher {
            handles,
            callbacks: self.callbacks,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config)?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Jsonl => {
            let sink = JsonlSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// The main Dispatcher: per-tuple callbacks plus sink fan-out
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    callbacks: Vec<AlignedCallback>,
    input_rx: mpsc::Receiver<AlignedFrame>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<AlignedFrame>) -> Self {
        Self {
            handles,
            callbacks: Vec::new(),
            input_rx,
        }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes frames from input, invokes callbacks and fans out to sinks.
    /// Returns when the input channel is closed.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(
            sinks = self.handles.len(),
            callbacks = self.callbacks.len(),
            "dispatcher started"
        );

        let mut frame_count: u64 = 0;

        while let Some(frame) = self.input_rx.recv().await {
            frame_count += 1;

            for callback in &self.callbacks {
                callback(&frame);
            }
            self.dispatch_frame(&frame);

            if frame_count.is_multiple_of(100) {
                debug!(frames = frame_count, "dispatcher progress");
            }
        }

        info!(frames = frame_count, "dispatcher input closed, shutting down");

        Self::shutdown_handles(self.handles).await;

        info!("dispatcher shutdown complete");
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    fn dispatch_frame(&self, frame: &AlignedFrame) {
        for handle in &self.handles {
            handle.try_send(frame.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, callbacks, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    callbacks: Vec<AlignedCallback>,
    input_rx: mpsc::Receiver<AlignedFrame>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    let mut builder = DispatcherBuilder::new(config, input_rx);
    for callback in callbacks {
        builder = builder.register_callback(callback);
    }
    builder.build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AlignMeta;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn frame(tuple_seq: u64) -> AlignedFrame {
        AlignedFrame {
            timestamp: tuple_seq * 1_000,
            tuple_seq,
            packets: Vec::new(),
            meta: AlignMeta::default(),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let sink1 = LogSink::new("sink1");
        let sink2 = LogSink::new("sink2");

        let handles = vec![SinkHandle::spawn(sink1, 10), SinkHandle::spawn(sink2, 10)];

        let dispatcher = Dispatcher::with_handles(handles, input_rx);
        let handle = dispatcher.spawn();

        for i in 0..5 {
            input_tx.send(frame(i)).await.unwrap();
        }

        drop(input_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_callbacks_invoked_in_registration_order() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        let o2 = Arc::clone(&order);

        let dispatcher = DispatcherBuilder::new(DispatcherConfig { sinks: vec![] }, input_rx)
            .register_callback(Arc::new(move |f| o1.lock().unwrap().push((1, f.tuple_seq))))
            .register_callback(Arc::new(move |f| o2.lock().unwrap().push((2, f.tuple_seq))))
            .build()
            .await
            .unwrap();
        let handle = dispatcher.spawn();

        input_tx.send(frame(7)).await.unwrap();
        drop(input_tx);
        handle.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec![(1, 7), (2, 7)]);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let counted = Arc::new(AtomicU64::new(0));
        let counted_cb = Arc::clone(&counted);
        let callbacks: Vec<AlignedCallback> = vec![Arc::new(move |_| {
            counted_cb.fetch_add(1, Ordering::Relaxed);
        })];

        let dispatcher = create_dispatcher(configs, callbacks, input_rx).await.unwrap();
        let handle = dispatcher.spawn();

        input_tx.send(frame(1)).await.unwrap();

        drop(input_tx);
        handle.await.unwrap();

        assert_eq!(counted.load(Ordering::Relaxed), 1);
    }
}
