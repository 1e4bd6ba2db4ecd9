//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! resilience field has a default, so a file only needs the base URLs it
//! wants to change.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::{BackoffPolicy, BreakerSettings, CallPolicy};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Email-verification service.
    pub verification: ServiceConfig,

    /// Video service (signed upload URLs).
    pub video: ServiceConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig::default(),
            verification: ServiceConfig::new("http://127.0.0.1:4001"),
            video: ServiceConfig::new("http://127.0.0.1:4002"),
        }
    }
}

/// One outbound dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL, e.g. "http://verification.internal:8080".
    pub base_url: String,

    /// Timeout, breaker and retry settings for calls to this service.
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            resilience: ResilienceConfig::default(),
        }
    }
}

/// Resilience settings in config-file units (milliseconds, percent).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Per-attempt timeout.
    pub timeout_ms: u64,

    /// Failure percentage over the window that opens the circuit.
    pub error_threshold_percentage: f64,

    /// Time the circuit stays open before a probe is allowed.
    pub reset_timeout_ms: u64,

    /// Total attempts per call.
    pub max_retries: u32,

    /// First backoff delay; doubles per attempt.
    pub backoff_base_ms: u64,

    /// Backoff ceiling.
    pub backoff_max_ms: u64,

    /// Extra random delay as a fraction of the backoff (0.0 - 1.0).
    pub backoff_jitter: f64,

    /// Observations required before the failure rate is evaluated. With
    /// fewer outcomes in the window the circuit stays closed whatever the
    /// failure rate.
    pub volume_threshold: u64,

    /// Statistics window length.
    pub rolling_window_ms: u64,

    /// Buckets in the statistics window.
    pub rolling_buckets: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            error_threshold_percentage: 50.0,
            reset_timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            backoff_jitter: 0.0,
            volume_threshold: 5,
            rolling_window_ms: 10_000,
            rolling_buckets: 10,
        }
    }
}

impl ResilienceConfig {
    /// Convert to the policy a `ResilientCall` is built from.
    pub fn to_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_millis(self.backoff_max_ms),
                jitter: self.backoff_jitter,
            },
            breaker: BreakerSettings {
                error_threshold_percentage: self.error_threshold_percentage,
                reset_timeout: Duration::from_millis(self.reset_timeout_ms),
                volume_threshold: self.volume_threshold,
                rolling_window: Duration::from_millis(self.rolling_window_ms),
                rolling_buckets: self.rolling_buckets,
            },
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ResilienceConfig::default().to_policy();
        assert_eq!(policy.timeout, Duration::from_millis(2000));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.breaker.error_threshold_percentage, 50.0);
        assert_eq!(policy.breaker.reset_timeout, Duration::from_secs(30));
        assert_eq!(policy.backoff.delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff.delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_minimal_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [video]
            base_url = "http://video.internal:9000"

            [video.resilience]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.video.base_url, "http://video.internal:9000");
        assert_eq!(config.video.resilience.max_retries, 5);
        assert_eq!(config.video.resilience.timeout_ms, 2000);
        assert_eq!(config.verification.base_url, "http://127.0.0.1:4001");
        assert_eq!(config.observability.log_format, "pretty");
    }
}
