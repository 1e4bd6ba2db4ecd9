//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → ResilienceConfig::to_policy() per outbound service
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers are built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::GuardConfig;
pub use schema::ObservabilityConfig;
pub use schema::ResilienceConfig;
pub use schema::ServiceConfig;
