#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Queue lengths and counters fit in usize/u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SinkError in sink module
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

pub mod app;
pub mod buffer;
pub mod connector;
pub mod domain;
pub mod sink;
pub mod worker;

pub use app::{App, Config};
pub use connector::{ConnectorConfig, LogConnector};
pub use domain::{ConnectorError, DeliveryError, LensMessage, LogEntry, SinkError};
pub use sink::{HttpSink, LogSink, SinkConfig};
pub use worker::{DeliveryWorker, RunOutcome, WorkerConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
