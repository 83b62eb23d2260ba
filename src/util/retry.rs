//! Retry with exponential backoff.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;

use crate::error::SwitchyardError;

/// Decides whether a failed attempt may be retried.
pub type RetryPredicate = Arc<dyn Fn(&SwitchyardError) -> bool + Send + Sync>;

/// Retry policy configuration.
///
/// The defaults give 3 retries after the first attempt, sleeping 1s, 2s and
/// 4s in between. An optional `deadline` bounds the whole run including
/// sleeps; when it passes, the run fails with [`SwitchyardError::Timeout`].
#[derive(Clone, Builder)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = Duration::from_secs(1))]
    pub initial_delay: Duration,
    #[builder(default = Duration::from_secs(60))]
    pub max_delay: Duration,
    #[builder(default = 2.0)]
    pub multiplier: f64,
    /// Randomize each sleep to 75%-125% of the nominal delay.
    #[builder(default = false)]
    pub jitter: bool,
    pub deadline: Option<Duration>,
    #[builder(default = default_predicate())]
    pub retry_if: RetryPredicate,
}

fn default_predicate() -> RetryPredicate {
    Arc::new(SwitchyardError::is_retryable)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Total attempts, counting the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Nominal sleep before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry as i32);
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Execute an async operation with retry, bounded by the deadline if set.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, SwitchyardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SwitchyardError>>,
    {
        match self.deadline {
            Some(deadline) => {
                crate::util::timeout::with_timeout(deadline, self.run(operation)).await
            }
            None => self.run(operation).await,
        }
    }

    async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, SwitchyardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SwitchyardError>>,
    {
        let max_attempts = self.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !(self.retry_if)(&e) || attempt + 1 >= max_attempts {
                        return Err(e);
                    }

                    let mut sleep_for = self.delay_for(attempt);
                    if self.jitter {
                        let jitter_factor = 0.75 + (rand_factor() * 0.5);
                        sleep_for = Duration::from_secs_f64(sleep_for.as_secs_f64() * jitter_factor);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = sleep_for.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );

                    tokio::time::sleep(sleep_for).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(SwitchyardError::Timeout(0)))
    }
}

/// Pseudo-random factor in [0, 1).
fn rand_factor() -> f64 {
    let nanos = uuid::Uuid::new_v4().as_u128();
    (nanos % 10_000) as f64 / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy::builder()
            .max_delay(Duration::from_secs(3))
            .build();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(3));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn default_predicate_follows_error_classification() {
        let policy = RetryPolicy::default();
        assert!((policy.retry_if)(&SwitchyardError::api(500, "boom")));
        assert!(!(policy.retry_if)(&SwitchyardError::api(400, "bad")));
    }
}
