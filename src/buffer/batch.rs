use crate::domain::LogEntry;
use std::time::Instant;
use uuid::Uuid;

/// Entries withdrawn from the queue for a single delivery attempt.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    entries: Vec<LogEntry>,
    created_at: Instant,
}

impl Batch {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entries,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn estimated_size(&self) -> usize {
        self.entries.iter().map(LogEntry::estimated_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        let entries = vec![LogEntry::new("c", "a"), LogEntry::new("c", "b")];
        let batch = Batch::new(entries.clone());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.entries(), entries.as_slice());
        assert_eq!(batch.into_entries(), entries);
    }

    #[test]
    fn test_batch_ids_differ() {
        let a = Batch::new(vec![]);
        let b = Batch::new(vec![]);
        assert!(a.is_empty());
        assert_ne!(a.id(), b.id());
    }
}
