//! Bounded retry with exponential backoff for outbound gateway calls.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::context::RequestContext;

#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts } => *attempts,
        }
    }
}

/// Attempt budget and backoff curve.
///
/// The delay before retry `n` (the `n+1`th attempt) is
/// `base_delay * backoff_factor^(n-1)`, capped at `max_delay`. Factors below
/// 1 are treated as 1 so delays never shrink.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            backoff_factor,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0);
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * factor.powi(exponent);
        let cap = self.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= cap {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Runs `operation` until it succeeds, the attempt budget is spent, or
    /// `ctx` is cancelled.
    pub async fn run<F, Fut, T, E>(
        &self,
        ctx: &RequestContext,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.attempts();
        let mut attempt = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
