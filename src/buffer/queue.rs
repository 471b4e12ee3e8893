use crate::domain::LogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
use mockall::automock;

/// Ordered holding area between producers and the delivery worker.
///
/// Any number of producers may `enqueue` concurrently with a single worker
/// draining. `len` is allowed to lag concurrent mutation; it only feeds the
/// best-effort capacity check.
#[cfg_attr(test, automock)]
pub trait IntakeQueue: Send + Sync {
    /// Appends one entry. Never blocks on I/O and never fails.
    fn enqueue(&self, entry: LogEntry);

    /// Removes and returns up to `max` entries in FIFO order.
    fn drain_up_to(&self, max: usize) -> Vec<LogEntry>;

    /// Puts a failed batch back after the current contents, keeping its internal order.
    fn requeue(&self, entries: Vec<LogEntry>);

    /// Destroys everything queued and returns how many entries were dropped.
    fn purge(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-protected `VecDeque` with a lock-free length mirror.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<LogEntry>>,
    len: AtomicUsize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            len: AtomicUsize::new(0),
        }
    }
}

impl IntakeQueue for MemoryQueue {
    #[inline]
    fn enqueue(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        self.len.store(entries.len(), Ordering::Release);
    }

    fn drain_up_to(&self, max: usize) -> Vec<LogEntry> {
        let mut entries = self.entries.lock();
        let take = max.min(entries.len());
        let batch: Vec<LogEntry> = entries.drain(..take).collect();
        self.len.store(entries.len(), Ordering::Release);
        batch
    }

    fn requeue(&self, batch: Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        entries.extend(batch);
        self.len.store(entries.len(), Ordering::Release);
    }

    fn purge(&self) -> usize {
        // Swap out under the lock, drop outside it.
        let dropped = {
            let mut entries = self.entries.lock();
            self.len.store(0, Ordering::Release);
            std::mem::take(&mut *entries)
        };
        dropped.len()
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn entry(i: usize) -> LogEntry {
        LogEntry::new("test", format!("message {i}"))
    }

    fn messages(entries: &[LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.message().to_string()).collect()
    }

    #[test]
    fn test_drain_is_fifo_and_bounded() {
        let queue = MemoryQueue::new();
        for i in 0..5 {
            queue.enqueue(entry(i));
        }

        let first = queue.drain_up_to(3);
        assert_eq!(messages(&first), vec!["message 0", "message 1", "message 2"]);
        assert_eq!(queue.len(), 2);

        let rest = queue.drain_up_to(10);
        assert_eq!(messages(&rest), vec!["message 3", "message 4"]);
        assert!(queue.is_empty());
        assert!(queue.drain_up_to(10).is_empty());
    }

    #[test]
    fn test_requeue_appends_after_newer_entries() {
        let queue = MemoryQueue::new();
        queue.enqueue(entry(0));
        queue.enqueue(entry(1));
        let batch = queue.drain_up_to(2);

        queue.enqueue(entry(2));
        queue.requeue(batch);

        let all = queue.drain_up_to(10);
        assert_eq!(messages(&all), vec!["message 2", "message 0", "message 1"]);
    }

    #[test]
    fn test_purge_reports_dropped_count() {
        let queue = MemoryQueue::with_capacity(16);
        for i in 0..7 {
            queue.enqueue(entry(i));
        }
        assert_eq!(queue.purge(), 7);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.purge(), 0);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(MemoryQueue::new());
        let producers: Vec<_> = (0..8)
            .map(|t| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..1000 {
                        queue.enqueue(LogEntry::new("t", format!("{t}-{i}")));
                    }
                })
            })
            .collect();

        let mut drained = 0;
        while producers.iter().any(|h| !h.is_finished()) {
            drained += queue.drain_up_to(20).len();
        }
        for handle in producers {
            handle.join().unwrap();
        }
        drained += queue.drain_up_to(usize::MAX).len();

        assert_eq!(drained, 8000);
        assert!(queue.is_empty());
    }
}
