//! Per-attempt deadline.
//!
//! A timed-out attempt's future is dropped. Whatever the remote side was doing
//! may still complete; its result is discarded.

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::resilience::types::ResilienceError;

/// Outcome of one bounded attempt.
#[derive(Debug)]
pub enum AttemptOutcome<O, E> {
    Completed(Result<O, E>),
    TimedOut(ResilienceError),
}

/// Run `fut` with a hard deadline of `limit`.
pub async fn with_timeout<F, O, E>(limit: Duration, fut: F) -> AttemptOutcome<O, E>
where
    F: Future<Output = Result<O, E>>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => AttemptOutcome::Completed(result),
        Err(_) => AttemptOutcome::TimedOut(ResilienceError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
