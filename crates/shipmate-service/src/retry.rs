//! # Upstream Retries
//!
//! Bounded retries with a linear backoff schedule for upstream HTTP calls.
//!
//! ```text
//! attempt 1 ──fail──► wait 1×step ──► attempt 2 ──fail──► wait 2×step ──► ...
//!                                                                          │
//!                    after `max_retries` retries the last error is returned┘
//! ```
//!
//! Only [`ServiceError::is_retryable`] errors are retried; anything else
//! (bad payload, 404) is returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Waits `step`, `2×step`, `3×step`, ... and gives up after `max_retries`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max_retries: u32,
    attempt: u32,
}

impl LinearBackoff {
    pub fn new(step: Duration, max_retries: u32) -> Self {
        LinearBackoff {
            step,
            max_retries,
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(self.step.saturating_mul(self.attempt))
    }
}

/// Runs `operation` until it succeeds, fails permanently or the schedule is
/// exhausted.
pub async fn with_retries<T, F, Fut>(
    what: &str,
    schedule: LinearBackoff,
    mut operation: F,
) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    backoff::future::retry_notify(
        schedule,
        || {
            let attempt = operation();
            async move {
                attempt.await.map_err(|err| {
                    if err.is_retryable() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: ServiceError, wait: Duration| {
            debug!(upstream = what, error = %err, wait_ms = wait.as_millis() as u64, "Retrying upstream call");
        },
    )
    .await
}
