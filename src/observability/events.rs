//! Circuit transition reporting.
//!
//! Subscribes to a breaker's broadcast channel and turns every
//! [`StateChange`] into a log line and metric updates. The reporter runs on
//! its own task so breakers never wait on it.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::resilience::types::{CircuitEvent, StateChange};

/// Log and record one transition.
pub fn report(change: &StateChange) {
    match change.event {
        CircuitEvent::Open => tracing::warn!(
            call = %change.breaker,
            from = %change.from,
            "Circuit opened, shedding load"
        ),
        CircuitEvent::HalfOpen => tracing::info!(
            call = %change.breaker,
            "Circuit half-open, probing dependency"
        ),
        CircuitEvent::Close => tracing::info!(
            call = %change.breaker,
            "Circuit closed, dependency recovered"
        ),
    }

    metrics::record_transition(&change.breaker, change.event);
    metrics::record_circuit_state(&change.breaker, change.to);
}

/// Spawn a task that reports every transition until the channel closes.
///
/// Returns the number of transitions reported when the task ends.
pub fn spawn_transition_reporter(mut events: broadcast::Receiver<StateChange>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut reported = 0;
        loop {
            match events.recv().await {
                Ok(change) => {
                    report(&change);
                    reported += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Transition reporter lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        reported
    })
}
