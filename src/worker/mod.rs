//! Delivery worker: drains the intake queue in bounded batches and pushes
//! them through the sink, requeueing on failure and purging on overflow.

pub mod task;

pub use task::{WorkerHandle, spawn_worker};

use crate::buffer::{Batch, DeliveryMetrics, IntakeQueue};
use crate::domain::{ConnectorError, DeliveryError};
use crate::sink::LogSink;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Messages per network call. Small enough to stay under the collector's payload limit.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
/// Queue length above which everything queued is purged.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub max_batch_size: usize,
    pub max_queue_size: usize,
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.max_batch_size == 0 {
            return Err(ConnectorError::InvalidConfiguration(
                "Max batch size must be greater than 0".to_string(),
            ));
        }
        if self.max_queue_size < self.max_batch_size {
            return Err(ConnectorError::InvalidConfiguration(format!(
                "Max queue size ({}) must be at least as large as max batch size ({})",
                self.max_queue_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

/// What a single run accomplished.
#[derive(Debug)]
pub enum RunOutcome {
    /// The queue was empty when the run started.
    Idle,
    /// The queue was emptied.
    Drained { delivered: usize, batches: usize },
    /// A batch failed; the run stopped after handing it back to the queue.
    Failed {
        error: DeliveryError,
        requeued: usize,
        queue_len: usize,
        delivered: usize,
    },
    /// The queue exceeded its cap and was cleared.
    Purged { purged: usize, delivered: usize },
}

impl RunOutcome {
    pub fn delivered(&self) -> usize {
        match self {
            RunOutcome::Idle => 0,
            RunOutcome::Drained { delivered, .. }
            | RunOutcome::Failed { delivered, .. }
            | RunOutcome::Purged { delivered, .. } => *delivered,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

pub struct DeliveryWorker<S, Q> {
    sink: S,
    queue: Arc<Q>,
    config: WorkerConfig,
    metrics: DeliveryMetrics,
}

impl<S, Q> DeliveryWorker<S, Q>
where
    S: LogSink,
    Q: IntakeQueue + 'static,
{
    pub fn new(
        sink: S,
        queue: Arc<Q>,
        config: WorkerConfig,
        metrics: DeliveryMetrics,
    ) -> Result<Self, ConnectorError> {
        config.validate()?;
        Ok(Self {
            sink,
            queue,
            config,
            metrics,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    pub fn config(&self) -> WorkerConfig {
        self.config
    }

    /// Ships queued entries until the queue is empty, a batch fails, or the
    /// queue is found over its cap.
    ///
    /// A failed batch is not retried within the same run; the next trigger
    /// picks it back up.
    pub async fn run_once(&mut self) -> RunOutcome {
        if self.queue.is_empty() {
            return RunOutcome::Idle;
        }

        let mut delivered = 0;
        let mut batches = 0;

        loop {
            // Best-effort: producers may enqueue between this read and the purge.
            let queued = self.queue.len();
            if queued > self.config.max_queue_size {
                let purged = self.queue.purge();
                self.metrics.record_purge(purged);
                let error = DeliveryError::CapacityExceeded {
                    queued,
                    limit: self.config.max_queue_size,
                };
                error!(purged, "{error}; purged buffered messages");
                return RunOutcome::Purged { purged, delivered };
            }

            let entries = self.queue.drain_up_to(self.config.max_batch_size);
            if entries.is_empty() {
                break;
            }

            let batch = Batch::new(entries);
            let batch_size = batch.len();

            if let Err(error) = self.deliver(&batch).await {
                let requeued = self.return_batch(batch);
                let queue_len = self.queue.len();
                warn!(batch_size, queue_len, "{error}");
                return RunOutcome::Failed {
                    error,
                    requeued,
                    queue_len,
                    delivered,
                };
            }

            self.metrics.record_batch_sent(batch_size);
            delivered += batch_size;
            batches += 1;

            if self.queue.is_empty() {
                break;
            }
        }

        debug!(delivered, batches, "Delivery run drained the queue");
        RunOutcome::Drained { delivered, batches }
    }

    async fn deliver(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        if !self.sink.is_open() {
            info!("Opening new connection");
            self.sink.open().await.map_err(DeliveryError::Connection)?;
        }
        self.sink
            .send_batch(batch)
            .await
            .map_err(DeliveryError::Send)
    }

    /// Hands a failed batch back to the queue. Returns how many entries were requeued.
    ///
    /// If putting the batch back would push the queue over its cap, the batch is
    /// dropped instead; the queue keeps what producers added meanwhile.
    fn return_batch(&self, batch: Batch) -> usize {
        let size = batch.len();
        let queued = self.queue.len();
        if queued + size > self.config.max_queue_size {
            self.metrics.record_failed_attempt(0);
            self.metrics.record_failed_batch_drop(size);
            error!(
                batch_size = size,
                queue_len = queued,
                limit = self.config.max_queue_size,
                "Failed batch would exceed queue limit; dropped"
            );
            return 0;
        }

        self.queue.requeue(batch.into_entries());
        self.metrics.record_failed_attempt(size);
        size
    }

    pub async fn close(&mut self) {
        self.sink.close().await;
    }
}
