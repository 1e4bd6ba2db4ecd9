//! Circuit states, transition notifications and error definitions.

use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use thiserror::Error;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; outcomes are counted.
    Closed,
    /// Calls are rejected until the reset timeout elapses.
    Open {
        /// When the breaker tripped (or re-tripped after a failed probe).
        since: Instant,
    },
    /// One trial call is allowed through to probe the dependency.
    HalfOpen,
}

impl CircuitState {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitState::Open { .. })
    }

    /// Numeric code used for the state gauge (0=closed, 1=open, 2=half-open).
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open { .. } => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a transition as seen by monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitEvent {
    Open,
    HalfOpen,
    Close,
}

impl CircuitEvent {
    /// Event name emitted to subscribers (`open`, `halfOpen`, `close`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitEvent::Open => "open",
            CircuitEvent::HalfOpen => "halfOpen",
            CircuitEvent::Close => "close",
        }
    }
}

impl fmt::Display for CircuitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single circuit state transition.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Name of the breaker that changed state.
    pub breaker: Arc<str>,
    pub from: CircuitState,
    pub to: CircuitState,
    pub event: CircuitEvent,
    pub at: Instant,
}

/// Snapshot of the rolling statistics window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    pub successes: u64,
    pub failures: u64,
}

impl WindowStats {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Failure rate in percent; 0 for an empty window.
    pub fn error_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.failures as f64 * 100.0 / total as f64
    }
}

/// Errors surfaced by guarded remote calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResilienceError {
    /// Breaker is tripped and the reset window has not elapsed.
    #[error("circuit for '{call}' is open; call rejected")]
    CircuitOpen { call: String },

    /// A single attempt exceeded its deadline.
    #[error("attempt timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Every attempt failed.
    #[error("remote call '{call}' failed after {attempts} attempts: {message}")]
    RemoteCallFailed {
        call: String,
        attempts: u32,
        message: String,
    },

    /// Input rejected before reaching the dependency.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ResilienceError {
    /// True when the dependency should be treated as unavailable
    /// (the 5xx class, as opposed to a caller mistake).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. } | ResilienceError::RemoteCallFailed { .. }
        )
    }
}

/// Result type for guarded calls.
pub type ResilienceResult<T> = Result<T, ResilienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(CircuitEvent::Open.as_str(), "open");
        assert_eq!(CircuitEvent::HalfOpen.as_str(), "halfOpen");
        assert_eq!(CircuitEvent::Close.to_string(), "close");
    }

    #[test]
    fn test_error_percentage() {
        assert_eq!(WindowStats::default().error_percentage(), 0.0);

        let stats = WindowStats { successes: 1, failures: 3 };
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.error_percentage(), 75.0);
    }

    #[test]
    fn test_error_display() {
        let err = ResilienceError::RemoteCallFailed {
            call: "video".into(),
            attempts: 3,
            message: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "remote call 'video' failed after 3 attempts: connection refused"
        );
        assert!(err.is_unavailable());

        let err = ResilienceError::Timeout { timeout_ms: 2000 };
        assert_eq!(err.to_string(), "attempt timed out after 2000 ms");
        assert!(!ResilienceError::InvalidInput("empty".into()).is_unavailable());
    }
}
