//! Producer-facing entry point.
//!
//! `send_message` only ever touches the intake queue and a trigger channel,
//! so it is safe to call from any thread, including ones outside the tokio
//! runtime, and it never waits on the network. Once the connector is closed
//! nothing drains the queue any more, so later messages are counted and dropped.

use crate::buffer::{DeliveryMetrics, IntakeQueue, MemoryQueue, MetricsSnapshot};
use crate::domain::{ConnectorError, LogEntry};
use crate::sink::{HttpSink, LogSink, SinkConfig};
use crate::worker::{DeliveryWorker, RunOutcome, WorkerConfig, WorkerHandle, spawn_worker};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Category attached by [`LogConnector::send`].
    pub category: String,
    pub worker: WorkerConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            category: "loglens".to_string(),
            worker: WorkerConfig::default(),
        }
    }
}

impl ConnectorConfig {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.category.is_empty() {
            return Err(ConnectorError::InvalidConfiguration(
                "Category must not be empty".to_string(),
            ));
        }
        self.worker.validate()
    }
}

/// Buffered, batching log shipper.
///
/// Cheap to clone; all clones feed the same queue and worker.
#[derive(Clone)]
pub struct LogConnector {
    category: Arc<str>,
    queue: Arc<MemoryQueue>,
    worker: WorkerHandle,
    metrics: DeliveryMetrics,
    closed: Arc<AtomicBool>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LogConnector {
    /// Starts a connector shipping over HTTP.
    pub fn connect(config: ConnectorConfig, sink_config: SinkConfig) -> Result<Self, ConnectorError> {
        let sink = HttpSink::new(sink_config)
            .map_err(|e| ConnectorError::InvalidConfiguration(e.to_string()))?;
        Self::start(config, sink)
    }

    /// Starts a connector on the current tokio runtime with the given sink.
    ///
    /// The sink is not opened here; the first delivery run opens it.
    pub fn start<S: LogSink>(config: ConnectorConfig, sink: S) -> Result<Self, ConnectorError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConnectorError::NoRuntime)?;

        let queue = Arc::new(MemoryQueue::with_capacity(config.worker.max_queue_size));
        let metrics = DeliveryMetrics::new();
        let worker = DeliveryWorker::new(sink, queue.clone(), config.worker, metrics.clone())?;
        let (handle, join) = spawn_worker(worker, &runtime);

        info!(
            category = %config.category,
            max_batch_size = config.worker.max_batch_size,
            max_queue_size = config.worker.max_queue_size,
            "Log connector started"
        );

        Ok(Self {
            category: Arc::from(config.category),
            queue,
            worker: handle,
            metrics,
            closed: Arc::new(AtomicBool::new(false)),
            join: Arc::new(Mutex::new(Some(join))),
        })
    }

    /// Queues a message under the configured category.
    pub fn send(&self, message: impl Into<String>) {
        self.enqueue(LogEntry::new(self.category.as_ref(), message));
    }

    /// Queues a message and schedules delivery. Never blocks, never fails.
    pub fn send_message(&self, category: impl Into<String>, message: impl Into<String>) {
        self.enqueue(LogEntry::new(category, message));
    }

    fn enqueue(&self, entry: LogEntry) {
        if self.closed.load(Ordering::Acquire) {
            self.metrics.record_dropped_after_close();
            debug!("Connector closed; message dropped");
            return;
        }
        self.queue.enqueue(entry);
        self.metrics.record_enqueued();
        self.worker.trigger();
    }

    /// Writes the message to standard output instead of shipping it.
    pub fn print_message(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{message}") {
            warn!("Failed to write message to stdout: {}", e);
        }
    }

    /// Runs one delivery pass and waits for it.
    pub async fn flush(&self) -> Result<RunOutcome, ConnectorError> {
        self.worker.flush().await
    }

    /// Closes the sink and stops the worker.
    ///
    /// Entries still queued are not delivered; their count is returned.
    /// Messages sent after this point are dropped.
    pub async fn close(&self) -> Result<usize, ConnectorError> {
        self.closed.store(true, Ordering::Release);
        let abandoned = self.worker.close().await?;

        let join = self.join.lock().take();
        if let Some(join) = join
            && let Err(e) = join.await
        {
            warn!("Delivery worker task ended abnormally: {}", e);
        }

        if abandoned > 0 {
            warn!(abandoned, "Connector closed with undelivered messages");
        }
        Ok(abandoned)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Approximate number of queued entries.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for LogConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogConnector")
            .field("category", &self.category)
            .field("queued", &self.len())
            .field("worker", &self.worker)
            .finish()
    }
}
