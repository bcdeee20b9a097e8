//! Progress reporting hooks.
//!
//! The core only emits numbers; rendering is up to the caller (the CLI draws
//! an `indicatif` bar).

use std::sync::Mutex;
use std::time::Duration;

/// Receives progress from the pipeline and the backend adapters.
pub trait ProgressSink: Send + Sync {
    /// A document run starts with `total` content segments.
    fn start(&self, label: &str, total: usize);

    /// `units` more content segments are done (translated or skipped).
    fn advance(&self, units: usize);

    /// A backend call sent `payload` characters and was throttled for `wait`.
    fn throttled(&self, payload: usize, wait: Duration);

    /// The run ended, successfully or not.
    fn finish(&self) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _label: &str, _total: usize) {}

    fn advance(&self, _units: usize) {}

    fn throttled(&self, _payload: usize, _wait: Duration) {}
}

/// Point-in-time view of a run's progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub label: String,
    pub total: usize,
    pub completed: usize,
    pub last_payload: usize,
    pub last_wait: Duration,
    pub throttled_calls: usize,
    pub finished: bool,
}

/// Keeps the latest numbers in memory
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn update(&self, f: impl FnOnce(&mut ProgressSnapshot)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl ProgressSink for ProgressTracker {
    fn start(&self, label: &str, total: usize) {
        self.update(|s| {
            *s = ProgressSnapshot {
                label: label.to_string(),
                total,
                ..ProgressSnapshot::default()
            };
        });
    }

    fn advance(&self, units: usize) {
        self.update(|s| s.completed = (s.completed + units).min(s.total));
    }

    fn throttled(&self, payload: usize, wait: Duration) {
        self.update(|s| {
            s.last_payload = payload;
            s.last_wait = wait;
            s.throttled_calls += 1;
        });
    }

    fn finish(&self) {
        self.update(|s| s.finished = true);
    }
}
