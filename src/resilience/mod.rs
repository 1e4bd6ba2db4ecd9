//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → call.rs (ResilientCall::invoke, one per dependency)
//!     → circuit_breaker.rs (admit, or reject while open)
//!     → timeouts.rs (hard per-attempt deadline)
//!     → window.rs (rolling success/failure counts)
//!     → retries.rs + backoff.rs (bounded exponential retries)
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline
//! - A rejected call is never retried; callers see `CircuitOpen`
//! - One breaker per dependency, shared by all of its callers
//! - Transitions are broadcast so observability can subscribe

pub mod backoff;
pub mod call;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;
pub mod types;
pub mod window;

pub use backoff::BackoffPolicy;
pub use call::{CallPolicy, ResilientCall};
pub use circuit_breaker::{BreakerSettings, CircuitBreaker};
pub use types::{
    CircuitEvent, CircuitState, ResilienceError, ResilienceResult, StateChange, WindowStats,
};
