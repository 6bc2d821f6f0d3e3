//! Bounded retry with a fixed delay plus random jitter.
//!
//! Delays never grow: a status lookup sits on a user-facing request path, so the
//! worst case stays at `max_attempts` calls and `(max_attempts - 1) * (base + jitter)`
//! of sleeping.

use crate::error::{FaultKind, SourceError};
use rand::Rng;
use std::future::Future;
use thiserror::Error;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(2);

/// Errors that know whether retrying them makes sense.
pub trait Classify {
    fn kind(&self) -> FaultKind;
}

impl Classify for SourceError {
    fn kind(&self) -> FaultKind {
        Self::kind(self)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient fault.
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
    /// A permanent fault stopped the loop early.
    #[error("non-retryable failure")]
    Aborted(#[source] E),
}

impl<E> RetryError<E> {
    /// The error returned by the final attempt.
    #[must_use]
    pub const fn last(&self) -> &E {
        match self {
            Self::Exhausted { last, .. } | Self::Aborted(last) => last,
        }
    }

    #[must_use]
    pub fn into_last(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::Aborted(last) => last,
        }
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_JITTER)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one call.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause before the next attempt: `base_delay` plus a uniform jitter in `[0, max_jitter)`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base_delay;
        }

        self.base_delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt budget is spent.
    ///
    /// # Errors
    /// Returns [`RetryError::Aborted`] on the first permanent fault and
    /// [`RetryError::Exhausted`] with the last transient fault once every attempt failed.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Classify + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "upstream call succeeded after retry");
                    }
                    return Ok(value);
                }

                Err(err) if err.kind() == FaultKind::Permanent => {
                    debug!(attempt, "permanent failure, not retrying: {}", err);
                    return Err(RetryError::Aborted(err));
                }

                Err(err) if attempt >= self.max_attempts => {
                    warn!("Giving up after {} attempts: {}", attempt, err);
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }

                Err(err) => {
                    let delay = self.delay();
                    warn!(
                        attempt,
                        "Transient failure: {}, backing off for {} ms",
                        err,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
