use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use flowrelay_core::{Error, Result};
use tracing::warn;

/// Suspends the retry loop between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Where a logical send currently stands.
#[derive(Debug)]
pub enum RetryState<T> {
    /// About to run the zero-based attempt.
    Attempting(u32),
    /// Waiting before `next_attempt`.
    Backoff { next_attempt: u32, delay: Duration },
    Succeeded(T),
    Exhausted(Error),
}

/// Exponential backoff: before attempt `n > 0` wait `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

    /// `max_attempts` below one is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Self::DEFAULT_BASE_DELAY,
        }
    }

    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Transition after `attempt` finished with `outcome`.
    pub fn advance<T>(&self, attempt: u32, outcome: Result<T>) -> RetryState<T> {
        match outcome {
            Ok(value) => RetryState::Succeeded(value),
            Err(e) if !e.is_retryable() => RetryState::Exhausted(e),
            Err(e) if attempt + 1 >= self.max_attempts => RetryState::Exhausted(Error::Exhausted {
                attempts: attempt + 1,
                last: Box::new(e),
            }),
            Err(e) => {
                let next_attempt = attempt + 1;
                let delay = self.delay_for(next_attempt);
                warn!(
                    "Flow request failed (attempt {}/{}): {e}",
                    attempt + 1,
                    self.max_attempts
                );
                RetryState::Backoff {
                    next_attempt,
                    delay,
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Drive `operation` through the retry state machine until it succeeds or
/// the policy gives up. The closure receives the zero-based attempt number.
pub async fn run_with_retry<T, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    S: Sleeper + ?Sized,
{
    let mut state = RetryState::Attempting(0);
    loop {
        state = match state {
            RetryState::Attempting(attempt) => policy.advance(attempt, operation(attempt).await),
            RetryState::Backoff {
                next_attempt,
                delay,
            } => {
                warn!(
                    "Retrying flow request in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    next_attempt + 1,
                    policy.max_attempts
                );
                sleeper.sleep(delay).await;
                RetryState::Attempting(next_attempt)
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Exhausted(e) => return Err(e),
        };
    }
}
