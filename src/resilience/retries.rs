//! Retry bookkeeping for one `invoke`.
//!
//! # Responsibilities
//! - Track which attempt is running and the last error seen
//! - Decide whether another attempt is allowed
//! - Build the terminal error once attempts run out
//!
//! Breaker rejections are never retried here; the caller ends the call
//! with `CircuitOpen` instead.

use std::time::Duration;

use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::types::ResilienceError;

/// State of a single in-flight `invoke`. Dropped when the call resolves.
#[derive(Debug)]
pub struct AttemptRecord {
    /// 0-based index of the current attempt.
    attempt: u32,
    max_attempts: u32,
    last_error: Option<String>,
}

impl AttemptRecord {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            last_error: None,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True while the current attempt index is within budget.
    pub fn in_budget(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Store a failed attempt. Returns the delay to wait before the next
    /// attempt, or `None` when this was the last one.
    pub fn fail(&mut self, message: String, backoff: &BackoffPolicy) -> Option<Duration> {
        self.last_error = Some(message);
        let failed = self.attempt;
        self.attempt += 1;
        if self.in_budget() {
            Some(backoff.delay(failed))
        } else {
            None
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Terminal error after every attempt failed.
    pub fn exhausted(self, call: &str) -> ResilienceError {
        ResilienceError::RemoteCallFailed {
            call: call.to_string(),
            attempts: self.attempt,
            message: self
                .last_error
                .unwrap_or_else(|| "no attempt was made".to_string()),
        }
    }
}
