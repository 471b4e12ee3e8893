use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub delivered_entries: u64,
    pub batches_sent: u64,
    pub failed_attempts: u64,
    pub requeued_entries: u64,
    pub purge_events: u64,
    pub purged_entries: u64,
    pub dropped_failed_entries: u64,
    pub dropped_after_close: u64,
    pub collapsed_triggers: u64,
}

/// Lock-free counters shared by the producer handle and the worker.
#[derive(Clone, Default)]
pub struct DeliveryMetrics {
    enqueued: Arc<AtomicU64>,
    delivered_entries: Arc<AtomicU64>,
    batches_sent: Arc<AtomicU64>,
    failed_attempts: Arc<AtomicU64>,
    requeued_entries: Arc<AtomicU64>,
    purge_events: Arc<AtomicU64>,
    purged_entries: Arc<AtomicU64>,
    dropped_failed_entries: Arc<AtomicU64>,
    dropped_after_close: Arc<AtomicU64>,
    collapsed_triggers: Arc<AtomicU64>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_sent(&self, entries: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.delivered_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_failed_attempt(&self, requeued: usize) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
        self.requeued_entries
            .fetch_add(requeued as u64, Ordering::Relaxed);
    }

    pub fn record_purge(&self, entries: usize) {
        self.purge_events.fetch_add(1, Ordering::Relaxed);
        self.purged_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_failed_batch_drop(&self, entries: usize) {
        self.dropped_failed_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped_after_close(&self) {
        self.dropped_after_close.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_collapsed_trigger(&self) {
        self.collapsed_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered_entries: self.delivered_entries.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            requeued_entries: self.requeued_entries.load(Ordering::Relaxed),
            purge_events: self.purge_events.load(Ordering::Relaxed),
            purged_entries: self.purged_entries.load(Ordering::Relaxed),
            dropped_failed_entries: self.dropped_failed_entries.load(Ordering::Relaxed),
            dropped_after_close: self.dropped_after_close.load(Ordering::Relaxed),
            collapsed_triggers: self.collapsed_triggers.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for DeliveryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DeliveryMetrics")
            .field(&self.snapshot())
            .finish()
    }
}
