use serde::{Deserialize, Serialize};

/// A single log line waiting to be shipped.
///
/// Entries are immutable once created. Ownership moves into the intake queue on
/// `send_message`, out into a batch for one delivery attempt, and back into the
/// queue if that attempt fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    category: String,
    message: String,
}

impl LogEntry {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Rough heap footprint, used for payload capacity hints.
    pub fn estimated_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.category.len() + self.message.len()
    }
}
