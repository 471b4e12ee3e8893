//! The sink capability the delivery worker ships batches through.
//!
//! The worker only relies on the four operations of [`LogSink`]; wire format,
//! authentication and transport all live behind it.

pub mod http;
pub mod serialization;

pub use http::{HttpSink, SinkConfig};
pub use serialization::{BatchSerializer, SerializationError};

use crate::buffer::Batch;
use crate::domain::SinkError;
use std::future::Future;

/// Connection-like resource owned by the delivery worker.
///
/// Only the worker task ever calls these methods, one at a time.
pub trait LogSink: Send + 'static {
    /// Establishes the connection. Must be callable again after a failed open.
    fn open(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn is_open(&self) -> bool;

    /// Delivers the whole batch or fails as a whole.
    fn send_batch(&mut self, batch: &Batch) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Flushes and closes. Flush failures are logged, never returned.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
