//! Timeout and retry handling for external sink calls
//!
//! Every call to a sink backend runs under a per-attempt timeout and is
//! retried a fixed number of times with exponential backoff when the
//! failure looks transient.

use crate::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Bounded retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Limit for a single attempt
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting; used by tests
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // attempt is 1-based; cap the exponent to keep the delay bounded
        self.base_delay
            .checked_mul(2u32.pow(attempt.saturating_sub(1).min(4)))
            .unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// attempts. The last error is returned.
    pub async fn run<T, F, Fut>(&self, description: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let error = match timeout(self.attempt_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => IntakeError::Timeout {
                    operation: description.to_string(),
                    limit: self.attempt_timeout,
                },
            };

            if attempt >= attempts || !error.is_retryable() {
                return Err(error);
            }

            let delay = self.backoff(attempt);
            warn!(
                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                description, attempt, attempts, error, delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
