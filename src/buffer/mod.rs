pub mod batch;
pub mod metrics;
pub mod queue;

pub use batch::Batch;
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use queue::{IntakeQueue, MemoryQueue};
