//! Domain layer for loglens-connector.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: a (category, message) pair owned by the queue until delivered
//! - `LensMessage`: the JSON envelope wrapped around every shipped event
//! - `SinkError` / `DeliveryError` / `ConnectorError`: the error taxonomy

pub mod envelope;
pub mod error;
pub mod log_entry;

pub use envelope::LensMessage;
pub use error::{ConnectorError, DeliveryError, SinkError};
pub use log_entry::LogEntry;
