use crate::sink::SerializationError;
use thiserror::Error;

/// Failure reported by a `LogSink`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Credentials rejected: HTTP {status}")]
    Unauthorized { status: u16 },
    #[error("Batch rejected: HTTP {status} - {message}")]
    Rejected { status: u16, message: String },
    #[error("Request timeout")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SinkError {
    /// Whether the connection should be torn down and reopened before the next send.
    pub fn invalidates_connection(&self) -> bool {
        match self {
            SinkError::ConnectionFailed(_) | SinkError::Unauthorized { .. } | SinkError::Timeout => {
                true
            }
            SinkError::Network(e) => e.is_connect() || e.is_timeout(),
            SinkError::Rejected { .. }
            | SinkError::Serialization(_)
            | SinkError::InvalidConfiguration(_) => false,
        }
    }
}

/// How a delivery attempt failed, as classified by the worker.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to open sink: {0}")]
    Connection(#[source] SinkError),
    #[error("Failed to send batch: {0}")]
    Send(#[source] SinkError),
    #[error("Queue holds {queued} entries, limit is {limit}")]
    CapacityExceeded { queued: usize, limit: usize },
}

/// Lifecycle failures surfaced to the embedding application.
///
/// `send_message` never returns one of these.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("No tokio runtime available to host the delivery worker")]
    NoRuntime,
    #[error("Delivery worker is no longer running")]
    WorkerGone,
}
