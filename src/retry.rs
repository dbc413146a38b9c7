//! Retry policy driven by the tri-state retry verdict.
//!
//! The core never retries on its own. Callers that want automatic retries
//! wrap `execute` (or stream creation) in [`RetryPolicy::run`].

use crate::error::{LlumiverseError, Retryable};
use crate::DriverResult;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Retries allowed for errors with an unknown verdict. Counted against
    /// `max_retries` as well.
    pub max_unknown_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_unknown_retries: 1,
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    pub fn with_unknown_retries(mut self, max_unknown_retries: u32) -> Self {
        self.max_unknown_retries = max_unknown_retries;
        self
    }

    /// Exponential backoff: `min_delay * 2^attempt`, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Decide after attempt number `attempt` (0-based) failed with `error`.
    ///
    /// `unknown_so_far` counts earlier attempts that failed with an unknown verdict.
    pub fn decide(&self, error: &LlumiverseError, attempt: u32, unknown_so_far: u32) -> Decision {
        if attempt >= self.max_retries {
            return Decision::Fail;
        }
        match error.retryable {
            Retryable::Yes => Decision::Retry {
                delay: self.backoff_delay(attempt),
            },
            Retryable::Unknown if unknown_so_far < self.max_unknown_retries => Decision::Retry {
                delay: self.backoff_delay(attempt),
            },
            Retryable::Unknown | Retryable::No => Decision::Fail,
        }
    }

    /// Run `operation` until it succeeds or the policy gives up. The last
    /// error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> DriverResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        let mut attempt = 0;
        let mut unknown = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.decide(&error, attempt, unknown) {
                Decision::Retry { delay } => {
                    if error.retryable.is_unknown() {
                        unknown += 1;
                    }
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        retryable = %error.retryable,
                        "retrying after failure: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Decision::Fail => {
                    if attempt > 0 {
                        warn!(attempts = attempt + 1, "giving up: {}", error);
                    }
                    return Err(error);
                }
            }
        }
    }
}
