//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilience layer produces:
//!     → tracing events (attempts, retries, rejections)
//!     → metrics.rs (attempt counters, call latency)
//!     → broadcast<StateChange> → events.rs (transition logs + metrics)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```

pub mod events;
pub mod logging;
pub mod metrics;
