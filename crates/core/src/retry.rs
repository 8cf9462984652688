// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jittered polling with a deadline
//!
//! Competing processes retry at random intervals so they do not hit the
//! store in lockstep. The deadline is measured on the runtime's timer from
//! the first attempt and checked before every retry.

use crate::config::RetryPolicy;
use crate::store::StoreError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// A successful acquisition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acquired {
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Time from the first attempt to success
    pub elapsed: Duration,
}

/// Why polling gave up
#[derive(Debug)]
pub(crate) struct Exhausted {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: Option<StoreError>,
}

impl RetryPolicy {
    /// Random delay within the policy bounds
    pub fn jitter(&self) -> Duration {
        if self.min_delay >= self.max_delay {
            return self.min_delay;
        }
        rand::rng().random_range(self.min_delay..=self.max_delay)
    }
}

/// Run `attempt` until it yields `true` or `timeout` has elapsed.
///
/// Store errors count as failed attempts and are retried.
pub(crate) async fn poll<F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    mut attempt: F,
) -> Result<Acquired, Exhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, StoreError>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        attempts += 1;
        match attempt().await {
            Ok(true) => {
                return Ok(Acquired {
                    attempts,
                    elapsed: start.elapsed(),
                })
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(attempts, error = %e, "store error while polling, retrying");
                last_error = Some(e);
            }
        }

        let elapsed = start.elapsed();
        if elapsed > timeout {
            return Err(Exhausted {
                attempts,
                elapsed,
                last_error,
            });
        }

        let delay = policy.jitter();
        tracing::trace!(attempts, delay_ms = delay.as_millis() as u64, "retrying");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
