//! Bounded retry with a fixed delay between attempts.
//!
//! The policy is plain data and the wait goes through a [`Sleeper`], so
//! callers can be tested without real delays.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Fixed wait between attempts. No exponential growth.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// What an attempt produced.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Done(T),
    /// Counts against the budget; the next attempt follows after the delay.
    Retry(E),
    /// Stops immediately without spending the remaining budget.
    Abort(E),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, aborts, or the attempt budget is spent.
    /// On exhaustion the last retryable error is returned.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Abort(e) => return Err(e),
                Attempt::Retry(e) => {
                    if attempt >= max_attempts {
                        warn!(attempt, max_attempts, "Giving up after final attempt: {}", e);
                        return Err(e);
                    }
                    debug!(
                        attempt,
                        delay_ms = self.delay.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        e
                    );
                    sleeper.sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
