//! Exponential-backoff retry around a [`ComicGenerator`].
//!
//! Wrapping is opt-in. The worker calls whatever generator it is handed;
//! [`Retrying`] only changes how many times one job's payload is sent.
//! Every attempt belongs to the same job.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::value::RawValue;

use crate::{ComicApiError, ComicGenerator};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` means no retry.
    pub max_attempts: u32,
    /// Delay before the second attempt, capped at `max_delay`.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }

    /// Delay slept after the first failed attempt.
    pub fn first_delay(&self) -> Duration {
        self.initial_delay.min(self.max_delay)
    }

    /// Longest a full run can take when each attempt is capped at
    /// `per_attempt`: every attempt times out and every backoff is slept.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let mut total = per_attempt * attempts;
        let mut delay = self.first_delay();
        for _ in 1..attempts {
            total += delay;
            delay = next_delay(delay, self);
        }
        total
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// A generator that retries transient failures of `inner`.
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G> Retrying<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<G: ComicGenerator> ComicGenerator for Retrying<G> {
    async fn generate(&self, payload: &RawValue) -> Result<Box<RawValue>, ComicApiError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.first_delay();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.generate(payload).await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Comic service succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Comic service attempt failed, retrying",
                    );
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(delay).await;
            delay = next_delay(delay, &self.policy);
        }
    }
}
