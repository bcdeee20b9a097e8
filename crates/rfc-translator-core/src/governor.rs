//! Mandatory pacing between backend calls.
//!
//! Google's abuse detection reacts to request rate, and a block applies to
//! the whole IP for a while. Every backend call therefore waits a delay that
//! grows with the amount of text sent, and waits never overlap.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::PacingConfig;

/// Throttles backend calls by payload size.
#[async_trait]
pub trait Governor: Send + Sync {
    /// Delay owed for a call that sent `payload` characters.
    fn delay_for(&self, payload: usize) -> Duration;

    /// Block the caller for `delay_for(payload)` and return the delay.
    async fn wait(&self, payload: usize) -> Duration;
}

/// `floor + payload * per_char`, enforced with `tokio::time::sleep`.
///
/// Clones share one gate, so two adapters built from the same governor
/// cannot sleep concurrently.
#[derive(Debug, Clone)]
pub struct LinearGovernor {
    floor: Duration,
    per_char: Duration,
    gate: Arc<Mutex<()>>,
}

impl LinearGovernor {
    pub fn new(floor: Duration, per_char: Duration) -> Self {
        Self {
            floor,
            per_char,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_pacing(pacing: PacingConfig) -> Self {
        Self::new(
            pacing.floor(),
            Duration::from_secs_f64(pacing.per_char_ms.max(0.0) / 1000.0),
        )
    }

    /// Same gate as `self`, different policy
    #[must_use]
    pub fn with_pacing(&self, pacing: PacingConfig) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
            ..Self::from_pacing(pacing)
        }
    }

    /// No delay at all; for tests and dry runs
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

#[async_trait]
impl Governor for LinearGovernor {
    fn delay_for(&self, payload: usize) -> Duration {
        let chars = u32::try_from(payload).unwrap_or(u32::MAX);
        self.floor.saturating_add(self.per_char.saturating_mul(chars))
    }

    async fn wait(&self, payload: usize) -> Duration {
        let delay = self.delay_for(payload);
        let _gate = self.gate.lock().await;
        debug!("Throttling {:.1}s after {} chars", delay.as_secs_f64(), payload);
        tokio::time::sleep(delay).await;
        delay
    }
}

/// Records waits instead of sleeping
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingGovernor {
    pub waits: std::sync::Mutex<Vec<usize>>,
}

#[cfg(test)]
impl CountingGovernor {
    pub fn payloads(&self) -> Vec<usize> {
        self.waits.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Governor for CountingGovernor {
    fn delay_for(&self, _payload: usize) -> Duration {
        Duration::ZERO
    }

    async fn wait(&self, payload: usize) -> Duration {
        self.waits.lock().unwrap().push(payload);
        Duration::ZERO
    }
}
