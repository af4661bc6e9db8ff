//! Retry policy with exponential backoff.
//!
//! The executor consults [`RetryPolicy::delay`] and the classification from
//! [`crate::error::classify`] when re-invoking failed nodes; [`RetryPolicy::run`]
//! is the standalone helper for callers retrying an arbitrary fallible
//! operation outside the executor.

use std::future::Future;
use std::time::Duration;

use crate::error::AgentError;

/// Exponential backoff: delay(attempt) = min(initial × factor^(attempt−1), max).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap applied to every computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with a custom retry cap and default backoff shape.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(raw).min(self.max_delay)
    }

    /// Whether another attempt is allowed (1-based attempt counter).
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Runs `op` until it succeeds, the classification says the failure is
    /// not retryable, or the retry cap is exhausted. Aborts immediately on a
    /// non-retryable classification.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if !err.class().retryable || !self.allows(attempt) {
                        return Err(err);
                    }
                    tracing::debug!(attempt, error = %err, "retrying after backoff");
                    tokio::time::sleep(self.delay(attempt)).await;
                }
            }
        }
    }
}
