//! Bounded retry with capped exponential back-off.
//!
//! Used by every provider to survive rate limiting. Only failures the
//! caller classifies as retryable are retried; everything else is returned
//! immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How often and how long to back off before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `action` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the last retryable error
    /// once `max_retries` retries have failed.
    pub async fn run<F, Fut, T, E, P>(&self, mut action: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut retries = 0;
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) if retries < self.max_retries && is_retryable(&err) => {
                    let delay = self.delay_for(retries);
                    retries += 1;
                    tracing::warn!(
                        retry = retries,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
