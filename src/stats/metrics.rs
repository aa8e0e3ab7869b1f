//! Statistics for publish attempts

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::ErrorKind;

/// Publisher-level statistics
#[derive(Debug, Clone, Default)]
pub struct PublisherStats {
    /// start() calls that passed validation
    pub attempts: u64,
    /// Attempts that reached Publishing
    pub successes: u64,
    /// Attempts superseded by stop()
    pub aborted: u64,
    /// stop() calls that released a session
    pub stops: u64,
    /// Failures by kind
    pub failures: HashMap<ErrorKind, u64>,
    /// When the current session started publishing
    pub publishing_since: Option<Instant>,
    /// Total time spent publishing in finished sessions
    pub total_publish_time: Duration,
}

impl PublisherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
        self.publishing_since = Some(Instant::now());
    }

    pub fn record_failure(&mut self, kind: ErrorKind) {
        *self.failures.entry(kind).or_insert(0) += 1;
    }

    pub fn record_aborted(&mut self) {
        self.aborted += 1;
    }

    /// Close out the current session, if it was publishing
    pub fn record_stop(&mut self) {
        self.stops += 1;
        if let Some(since) = self.publishing_since.take() {
            self.total_publish_time += since.elapsed();
        }
    }

    pub fn failures(&self, kind: ErrorKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Time the current session has been publishing
    pub fn current_publish_time(&self) -> Duration {
        self.publishing_since
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}
