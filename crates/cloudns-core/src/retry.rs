//! Bounded retry with a fixed delay
//!
//! One invocation touches one record set, so there is no backoff and no
//! jitter: a failed attempt classified as retryable by
//! [`Error::is_retryable`] waits the configured delay and runs again, up to
//! the attempt budget.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Retry policy for reconciliation attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy running at most `max_attempts` attempts (at least one)
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails fatally, or the attempts run out
    ///
    /// Returns the last error observed when every attempt failed.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_until_cancelled(&CancellationToken::new(), op).await
    }

    /// Like [`RetryPolicy::run`], but stops waiting for the next attempt
    /// once `cancel` fires
    ///
    /// Cancellation during the delay returns [`Error::Cancelled`] without
    /// starting another attempt.
    pub async fn run_until_cancelled<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, self.max_attempts, self.delay, e
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!("Cancelled before attempt {}", attempt + 1);
                            return Err(Error::Cancelled);
                        }
                        _ = tokio::time::sleep(self.delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("Giving up after {} attempt(s): {}", attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
