use super::{DeliveryWorker, RunOutcome};
use crate::buffer::{DeliveryMetrics, IntakeQueue};
use crate::domain::ConnectorError;
use crate::sink::LogSink;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

enum Control {
    Flush(oneshot::Sender<RunOutcome>),
    Close(oneshot::Sender<usize>),
}

/// Cloneable handle for scheduling runs on the single worker task.
#[derive(Clone)]
pub struct WorkerHandle {
    trigger_tx: mpsc::Sender<()>,
    control_tx: mpsc::UnboundedSender<Control>,
    metrics: DeliveryMetrics,
}

impl WorkerHandle {
    /// Requests a run without waiting. At most one request is ever pending;
    /// extra triggers collapse into it.
    pub fn trigger(&self) {
        match self.trigger_tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                self.metrics.record_collapsed_trigger();
                trace!("Delivery run already pending");
            }
            Err(TrySendError::Closed(())) => {
                trace!("Delivery worker stopped; trigger ignored");
            }
        }
    }

    /// Runs the worker once, after any run already in progress, and returns its outcome.
    pub async fn flush(&self) -> Result<RunOutcome, ConnectorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control_tx
            .send(Control::Flush(reply_tx))
            .map_err(|_| ConnectorError::WorkerGone)?;
        reply_rx.await.map_err(|_| ConnectorError::WorkerGone)
    }

    /// Closes the sink and stops the worker. Returns the number of entries left queued.
    pub async fn close(&self) -> Result<usize, ConnectorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control_tx
            .send(Control::Close(reply_tx))
            .map_err(|_| ConnectorError::WorkerGone)?;
        reply_rx.await.map_err(|_| ConnectorError::WorkerGone)
    }

    pub fn is_running(&self) -> bool {
        !self.control_tx.is_closed()
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Moves the worker onto its own task. Everything that touches the sink runs there.
pub fn spawn_worker<S, Q>(
    worker: DeliveryWorker<S, Q>,
    runtime: &Handle,
) -> (WorkerHandle, JoinHandle<()>)
where
    S: LogSink,
    Q: IntakeQueue + 'static,
{
    // Capacity 1: one queued run behind the active one is all that is ever needed.
    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let metrics = worker.metrics.clone();

    let join = runtime.spawn(run_worker(worker, trigger_rx, control_rx));

    (
        WorkerHandle {
            trigger_tx,
            control_tx,
            metrics,
        },
        join,
    )
}

async fn run_worker<S, Q>(
    mut worker: DeliveryWorker<S, Q>,
    mut trigger_rx: mpsc::Receiver<()>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) where
    S: LogSink,
    Q: IntakeQueue + 'static,
{
    debug!(
        max_batch_size = worker.config.max_batch_size,
        max_queue_size = worker.config.max_queue_size,
        "Delivery worker started"
    );

    loop {
        tokio::select! {
            biased;

            control = control_rx.recv() => match control {
                Some(Control::Flush(reply)) => {
                    let outcome = worker.run_once().await;
                    let _ = reply.send(outcome);
                }
                Some(Control::Close(reply)) => {
                    worker.close().await;
                    let abandoned = worker.queue.len();
                    if abandoned > 0 {
                        info!(abandoned, "Delivery worker closed with undelivered messages");
                    }
                    let _ = reply.send(abandoned);
                    return;
                }
                None => break,
            },

            trigger = trigger_rx.recv() => match trigger {
                Some(()) => {
                    let outcome = worker.run_once().await;
                    trace!(?outcome, "Triggered delivery run finished");
                }
                None => break,
            },
        }
    }

    // Every handle is gone.
    worker.close().await;
    debug!("Delivery worker stopped");
}
