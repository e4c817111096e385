//! Retry policy with exponential backoff.
//!
//! Only errors that report [`RegistryError::is_transient`](crate::error::RegistryError::is_transient) are retried:
//! index and listing outages, transport failures, timeouts, and 5xx
//! answers. A missing package or a digest mismatch fails immediately.
//!
//! Delay before retry `n` (0-based) is `initial_backoff * 2^n`, capped at
//! `max_backoff`.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the first attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `step` (0 before the first retry).
    #[must_use]
    pub fn delay_for(&self, step: u32) -> Duration {
        let factor = 2u32.checked_pow(step).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `what` names the operation in log output.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut step = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && step < self.max_retries => {
                    let delay = self.delay_for(step);
                    tracing::warn!(
                        operation = what,
                        attempt = step + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    step += 1;
                }
                Err(err) => {
                    if step > 0 {
                        tracing::debug!(operation = what, retries = step, "giving up");
                    }
                    return Err(err);
                }
            }
        }
    }
}
