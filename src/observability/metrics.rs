//! Metrics collection and exposition.
//!
//! # Metrics
//! - `callguard_attempts_total` (counter): attempts by call and outcome
//! - `callguard_call_duration_seconds` (histogram): end-to-end `invoke` latency
//! - `callguard_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `callguard_circuit_transitions_total` (counter): transitions by call and event
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::time::Instant;

use crate::resilience::types::{CircuitEvent, CircuitState};

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const OUTCOME_TIMEOUT: &str = "timeout";
pub const OUTCOME_REJECTED: &str = "rejected";

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one attempt (or rejection) for `call`.
pub fn record_attempt(call: &str, outcome: &'static str) {
    counter!(
        "callguard_attempts_total",
        "call" => call.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_call_duration(call: &str, started: Instant) {
    histogram!("callguard_call_duration_seconds", "call" => call.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_circuit_state(call: &str, state: CircuitState) {
    gauge!("callguard_circuit_state", "call" => call.to_string()).set(state.as_gauge());
}

pub fn record_transition(call: &str, event: CircuitEvent) {
    counter!(
        "callguard_circuit_transitions_total",
        "call" => call.to_string(),
        "event" => event.as_str()
    )
    .increment(1);
}
