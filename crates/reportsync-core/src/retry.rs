//! Fixed-interval retry for pipeline stages.
//!
//! Every stage failure is treated as transient: it is logged, the policy
//! sleeps for a fixed delay, and the same stage runs again. Policies are
//! unbounded unless [`RetryPolicy::with_max_attempts`] is used.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Source of the delay between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Returned only by bounded policies once the last allowed attempt fails.
#[derive(Debug, Error)]
#[error("{stage} failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    pub stage: &'static str,
    pub attempts: u32,
    pub last_error: E,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy<S = TokioSleeper> {
    delay: Duration,
    max_attempts: Option<u32>,
    sleeper: S,
}

impl RetryPolicy<TokioSleeper> {
    /// Retry forever, sleeping `delay` between attempts.
    #[must_use]
    pub fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: Sleeper> RetryPolicy<S> {
    #[must_use]
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RetryPolicy<T> {
        RetryPolicy {
            delay: self.delay,
            max_attempts: self.max_attempts,
            sleeper,
        }
    }

    /// Cap the total number of attempts (first try included). `0` is treated as `1`.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Run `operation` until it succeeds.
    ///
    /// Each failure is logged at error level with the stage name, the attempt
    /// number and the error text, followed by one sleep of the fixed delay.
    ///
    /// # Errors
    ///
    /// Only bounded policies return [`RetryExhausted`], carrying the last error.
    pub async fn run<T, E, F, Fut>(
        &self,
        stage: &'static str,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(stage, attempt, "stage succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        tracing::error!(stage, attempt, error = %err, "stage failed, giving up");
                        return Err(RetryExhausted {
                            stage,
                            attempts: attempt,
                            last_error: err,
                        });
                    }
                    tracing::error!(
                        stage,
                        attempt,
                        delay_secs = self.delay.as_secs(),
                        error = %err,
                        "stage failed, retrying after fixed delay"
                    );
                    self.sleeper.sleep(self.delay).await;
                }
            }
        }
    }
}
