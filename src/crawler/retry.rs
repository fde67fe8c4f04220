//! Bounded retry around fetch units
//!
//! Validation errors end the loop at once. Every other error is retried
//! immediately, without delay, until `retry_limit` attempts have been made.
//! Unshielded work stops as soon as the job begins closing.

use crate::fetch::FetchError;
use std::future::Future;

/// How a retried unit ended
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success(T),

    /// Permanent failure, never retried
    Rejected(FetchError),

    /// The job started closing before an attempt could be made
    Cancelled,

    /// Every attempt failed; carries the last error
    Exhausted(FetchError),
}

impl<T> RetryOutcome<T> {
    /// The result, or `None` for any kind of failure
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}

/// Runs `op` up to `retry_limit` times
///
/// `closing` is consulted before every attempt unless `shield` is set.
pub async fn retriable<T, F, Fut, C>(
    mut op: F,
    retry_limit: u32,
    shield: bool,
    closing: C,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    C: Fn() -> bool,
{
    let attempts = retry_limit.max(1);
    let mut attempt = 0;

    loop {
        if !shield && closing() {
            return RetryOutcome::Cancelled;
        }
        attempt += 1;

        match op().await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(e) if e.is_validation() => {
                tracing::debug!("Not retrying: {}", e);
                return RetryOutcome::Rejected(e);
            }
            Err(e) if attempt >= attempts => {
                return RetryOutcome::Exhausted(e);
            }
            Err(e) => {
                tracing::debug!("Attempt {}/{} failed: {}", attempt, attempts, e);
            }
        }
    }
}
