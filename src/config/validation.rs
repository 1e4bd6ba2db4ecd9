//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and URLs. All problems are
//! collected so an operator can fix a file in one pass.

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{GuardConfig, ObservabilityConfig, ResilienceConfig, ServiceConfig};
use crate::resilience::window::MAX_BUCKETS;

/// Longest backoff delay a config may ask for (one hour).
const MAX_BACKOFF_MS: u64 = 3_600_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. "video.resilience.timeout_ms".
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the whole configuration, returning every error found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_observability(&config.observability, &mut errors);
    validate_service("verification", &config.verification, &mut errors);
    validate_service("video", &config.video, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_observability(config: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if !matches!(config.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected \"pretty\" or \"json\", got \"{}\"", config.log_format),
        ));
    }

    if config.metrics_enabled && config.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("\"{}\" is not a socket address", config.metrics_address),
        ));
    }
}

fn validate_service(name: &str, config: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    match Url::parse(&config.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            format!("{}.base_url", name),
            format!("unsupported scheme \"{}\"", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            format!("{}.base_url", name),
            format!("invalid URL \"{}\": {}", config.base_url, e),
        )),
    }

    validate_resilience(&format!("{}.resilience", name), &config.resilience, errors);
}

fn validate_resilience(prefix: &str, config: &ResilienceConfig, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("{}.{}", prefix, name);

    if config.timeout_ms == 0 {
        errors.push(ValidationError::new(field("timeout_ms"), "must be greater than 0"));
    }
    if config.max_retries == 0 {
        errors.push(ValidationError::new(field("max_retries"), "must be at least 1"));
    }
    if !(config.error_threshold_percentage > 0.0 && config.error_threshold_percentage <= 100.0) {
        errors.push(ValidationError::new(
            field("error_threshold_percentage"),
            "must be in (0, 100]",
        ));
    }
    if config.reset_timeout_ms == 0 {
        errors.push(ValidationError::new(field("reset_timeout_ms"), "must be greater than 0"));
    }
    if config.backoff_max_ms < config.backoff_base_ms {
        errors.push(ValidationError::new(
            field("backoff_max_ms"),
            "must not be smaller than backoff_base_ms",
        ));
    } else if config.backoff_max_ms > MAX_BACKOFF_MS {
        errors.push(ValidationError::new(
            field("backoff_max_ms"),
            format!("must not exceed {} ms", MAX_BACKOFF_MS),
        ));
    }
    if !(0.0..=1.0).contains(&config.backoff_jitter) {
        errors.push(ValidationError::new(field("backoff_jitter"), "must be in [0.0, 1.0]"));
    }
    if config.rolling_buckets == 0 {
        errors.push(ValidationError::new(field("rolling_buckets"), "must be at least 1"));
    } else if config.rolling_buckets > MAX_BUCKETS {
        errors.push(ValidationError::new(
            field("rolling_buckets"),
            format!("must not exceed {}", MAX_BUCKETS),
        ));
    } else if config.rolling_window_ms < config.rolling_buckets as u64 {
        errors.push(ValidationError::new(
            field("rolling_window_ms"),
            "must be at least 1 ms per bucket",
        ));
    }
}
