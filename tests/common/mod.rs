#![allow(dead_code)]

use loglens_connector::buffer::Batch;
use loglens_connector::domain::{LogEntry, SinkError};
use loglens_connector::sink::LogSink;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct SinkState {
    pub open: bool,
    pub open_calls: usize,
    pub close_calls: usize,
    pub open_results: VecDeque<Result<(), SinkError>>,
    pub send_results: VecDeque<Result<(), SinkError>>,
    pub sent: Vec<Vec<LogEntry>>,
    pub send_delay: Option<Duration>,
    /// Every unscripted send times out.
    pub always_fail: bool,
}

/// Sink whose results are scripted and whose traffic stays inspectable after
/// it has moved into a worker. Unscripted calls succeed.
#[derive(Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open_with(&self, error: SinkError) {
        self.state.lock().open_results.push_back(Err(error));
    }

    pub fn succeed_sends(&self, n: usize) {
        let mut state = self.state.lock();
        for _ in 0..n {
            state.send_results.push_back(Ok(()));
        }
    }

    pub fn fail_send_with(&self, error: SinkError) {
        self.state.lock().send_results.push_back(Err(error));
    }

    pub fn fail_all_sends(&self) {
        self.state.lock().always_fail = true;
    }

    pub fn delay_sends(&self, delay: Duration) {
        self.state.lock().send_delay = Some(delay);
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().sent.iter().map(Vec::len).collect()
    }

    /// Delivered messages in send order.
    pub fn messages(&self) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .flatten()
            .map(|e| e.message().to_string())
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .flatten()
            .map(|e| e.category().to_string())
            .collect()
    }

    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    pub fn currently_open(&self) -> bool {
        self.state.lock().open
    }
}

impl LogSink for RecordingSink {
    async fn open(&mut self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.open_calls += 1;
        let result = state.open_results.pop_front().unwrap_or(Ok(()));
        state.open = result.is_ok();
        result
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    async fn send_batch(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let delay = self.state.lock().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let fallback = if state.always_fail {
            Err(SinkError::Timeout)
        } else {
            Ok(())
        };
        let result = state.send_results.pop_front().unwrap_or(fallback);
        match &result {
            Ok(()) => state.sent.push(batch.entries().to_vec()),
            Err(e) if e.invalidates_connection() => state.open = false,
            Err(_) => {}
        }
        result
    }

    async fn close(&mut self) {
        let mut state = self.state.lock();
        state.open = false;
        state.close_calls += 1;
    }
}

pub fn messages(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}
