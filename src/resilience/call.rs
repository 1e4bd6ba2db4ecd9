//! Guarded remote call: timeout, circuit breaker and retries around one
//! asynchronous operation.
//!
//! # Data Flow
//! ```text
//! invoke(input)
//!     → circuit_breaker.rs (admission: allowed / trial / rejected)
//!     → timeouts.rs (operation(input) under a hard deadline)
//!     → circuit_breaker.rs (record outcome, maybe transition)
//!     → retries.rs + backoff.rs (sleep and try again, or give up)
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::circuit_breaker::{Admission, BreakerSettings, CircuitBreaker};
use crate::resilience::retries::AttemptRecord;
use crate::resilience::timeouts::{with_timeout, AttemptOutcome};
use crate::resilience::types::{
    CircuitState, ResilienceError, ResilienceResult, StateChange, WindowStats,
};

/// Per-wrapper configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Hard deadline for each attempt.
    pub timeout: Duration,
    /// Total attempts per `invoke`, including the first.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
    /// Breaker thresholds.
    pub breaker: BreakerSettings,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            max_retries: 3,
            backoff: BackoffPolicy::default(),
            breaker: BreakerSettings::default(),
        }
    }
}

/// A remote operation wrapped with timeout, breaker and retries.
///
/// One instance is meant to be shared (behind `Arc` or by reference) by every
/// caller of the dependency, since the breaker state is per instance.
pub struct ResilientCall<F> {
    name: Arc<str>,
    operation: F,
    policy: CallPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl<F> ResilientCall<F> {
    /// Wrap `operation` with its own breaker built from `policy.breaker`.
    pub fn new(name: impl Into<Arc<str>>, operation: F, policy: CallPolicy) -> Self {
        let name = name.into();
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), policy.breaker.clone()));
        Self {
            name,
            operation,
            policy,
            breaker,
        }
    }

    /// Wrap `operation` around an existing breaker; `policy.breaker` is ignored.
    pub fn with_breaker(
        name: impl Into<Arc<str>>,
        operation: F,
        policy: CallPolicy,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            name: name.into(),
            operation,
            policy,
            breaker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn stats(&self) -> WindowStats {
        self.breaker.stats()
    }

    /// Subscribe to circuit transitions of this wrapper's breaker.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.breaker.subscribe()
    }

    /// Call the operation with full protection.
    ///
    /// Resolves with the operation's value, or fails with
    /// [`ResilienceError::CircuitOpen`] (breaker rejected an attempt) or
    /// [`ResilienceError::RemoteCallFailed`] (every attempt failed).
    pub async fn invoke<I, O, E, Fut>(&self, input: I) -> ResilienceResult<O>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O, E>>,
        E: fmt::Display,
        I: Clone,
    {
        let span = tracing::debug_span!(
            "remote_call",
            call = %self.name,
            call_id = %Uuid::new_v4()
        );
        self.run(input).instrument(span).await
    }

    async fn run<I, O, E, Fut>(&self, input: I) -> ResilienceResult<O>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O, E>>,
        E: fmt::Display,
        I: Clone,
    {
        let started = Instant::now();
        let mut record = AttemptRecord::new(self.policy.max_retries);

        while record.in_budget() {
            let permit = match self.breaker.try_acquire() {
                Admission::Allowed => None,
                Admission::Trial(permit) => {
                    tracing::info!(
                        attempt = record.attempt(),
                        "Probing dependency through half-open circuit"
                    );
                    Some(permit)
                }
                Admission::Rejected => {
                    tracing::warn!(attempt = record.attempt(), "Circuit open, call rejected");
                    metrics::record_attempt(&self.name, metrics::OUTCOME_REJECTED);
                    metrics::record_call_duration(&self.name, started);
                    return Err(ResilienceError::CircuitOpen {
                        call: self.name.to_string(),
                    });
                }
            };

            let (message, outcome) =
                match with_timeout(self.policy.timeout, (self.operation)(input.clone())).await {
                    AttemptOutcome::Completed(Ok(value)) => {
                        match permit {
                            Some(permit) => permit.succeed(),
                            None => self.breaker.record_success(),
                        }
                        metrics::record_attempt(&self.name, metrics::OUTCOME_SUCCESS);
                        metrics::record_call_duration(&self.name, started);
                        tracing::debug!(attempt = record.attempt(), "Remote call succeeded");
                        return Ok(value);
                    }
                    AttemptOutcome::Completed(Err(e)) => (e.to_string(), metrics::OUTCOME_FAILURE),
                    AttemptOutcome::TimedOut(e) => (e.to_string(), metrics::OUTCOME_TIMEOUT),
                };

            match permit {
                Some(permit) => permit.fail(),
                None => self.breaker.record_failure(),
            }
            metrics::record_attempt(&self.name, outcome);

            let attempt = record.attempt();
            match record.fail(message, &self.policy.backoff) {
                Some(delay) => {
                    tracing::info!(
                        attempt,
                        delay = ?delay,
                        error = record.last_error().unwrap_or_default(),
                        "Remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(
                        attempt,
                        error = record.last_error().unwrap_or_default(),
                        "Remote call failed, no attempts left"
                    );
                }
            }
        }

        metrics::record_call_duration(&self.name, started);
        Err(record.exhausted(&self.name))
    }
}

impl<F> fmt::Debug for ResilientCall<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCall")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("state", &self.breaker.state())
            .finish()
    }
}
