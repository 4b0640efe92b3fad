//! Retry policy and the shared retry-with-backoff loop

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy for upstream calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Backoff coefficient (multiplier for each retry, 1.0 = constant delay)
    pub backoff_coefficient: f64,
    /// Maximum retry interval
    pub maximum_interval: Duration,
    /// Maximum number of attempts, including the first (minimum 1)
    pub maximum_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: 3,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed delay between a fixed number of attempts
    pub fn constant(attempts: u32, interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            backoff_coefficient: 1.0,
            maximum_interval: interval,
            maximum_attempts: attempts,
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = interval;
        self
    }

    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    /// Attempts actually made; a zero setting still makes one call.
    pub fn attempts(&self) -> u32 {
        self.maximum_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let coefficient = if self.backoff_coefficient.is_finite() && self.backoff_coefficient >= 1.0 {
            self.backoff_coefficient
        } else {
            1.0
        };
        let secs = self.initial_interval.as_secs_f64() * coefficient.powi(exponent);
        let capped = secs.min(self.maximum_interval.as_secs_f64().max(self.initial_interval.as_secs_f64()));
        Duration::from_secs_f64(capped)
    }
}

/// Outcome of an exhausted or aborted retry loop
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::fmt::Display> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("non-retryable failure on attempt {attempt}: {error}")]
    Aborted { attempt: u32, error: E },
}

impl<E: std::fmt::Display> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Aborted { attempt, .. } => *attempt,
        }
    }
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// policy's attempt budget is spent. Waits cooperatively between attempts.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> std::result::Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Aborted { attempt, error });
            }
            Err(error) if attempt >= attempts => {
                return Err(RetryError::Exhausted { attempts: attempt, last: error });
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                debug!(attempt, max_attempts = attempts, delay_ms = delay.as_millis() as u64, %error, "Retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
