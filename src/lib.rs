//! Resilient outbound calls for Tokio services.

pub mod clients;
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::schema::GuardConfig;
pub use resilience::{CallPolicy, CircuitBreaker, ResilienceError, ResilientCall};
