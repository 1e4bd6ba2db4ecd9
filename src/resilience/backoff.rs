//! Delay schedule between attempts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use rand::Rng;

/// Maps a 0-based attempt index to the delay before the next attempt.
#[derive(Clone)]
pub enum BackoffPolicy {
    /// `base * 2^attempt`, capped at `max`, plus up to `jitter * delay` extra.
    Exponential {
        base: Duration,
        max: Duration,
        jitter: f64,
    },
    /// Same delay after every attempt.
    Fixed(Duration),
    /// Caller-supplied schedule.
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl BackoffPolicy {
    /// 1s, 2s, 4s, ... capped at 30s, no jitter.
    pub fn exponential(base: Duration) -> Self {
        BackoffPolicy::Exponential {
            base,
            max: Duration::from_secs(30),
            jitter: 0.0,
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        BackoffPolicy::Custom(Arc::new(f))
    }

    /// Delay to wait after the failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffPolicy::Exponential { base, max, jitter } => {
                let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                calculate_backoff(attempt, base_ms, max_ms, *jitter)
            }
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Custom(f) => f(attempt),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(1000))
    }
}

impl fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffPolicy::Exponential { base, max, jitter } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("max", max)
                .field("jitter", jitter)
                .finish(),
            BackoffPolicy::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            BackoffPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Exponential backoff for a 0-based attempt with optional jitter.
///
/// Jitter only ever adds to the delay, so the schedule is a lower bound.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter: f64) -> Duration {
    let exponential_base = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 1000, 30_000, 0.0), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(1, 1000, 30_000, 0.0), Duration::from_millis(2000));
        assert_eq!(calculate_backoff(2, 1000, 30_000, 0.0), Duration::from_millis(4000));

        let max = calculate_backoff(10, 100, 1000, 0.0);
        assert_eq!(max, Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..50 {
            let d = calculate_backoff(1, 100, 2000, 0.1);
            assert!(d >= Duration::from_millis(200));
            assert!(d < Duration::from_millis(220));
        }
    }

    #[test]
    fn test_huge_delay_with_jitter_saturates() {
        let d = calculate_backoff(1, u64::MAX / 2, u64::MAX, 1.0);
        assert!(d >= Duration::from_millis(u64::MAX - 1));

        let policy = BackoffPolicy::Exponential {
            base: Duration::from_millis(u64::MAX / 2),
            max: Duration::from_millis(u64::MAX),
            jitter: 1.0,
        };
        assert!(policy.delay(1) >= Duration::from_millis(u64::MAX - 1));
    }

    #[test]
    fn test_policies() {
        assert_eq!(BackoffPolicy::default().delay(1), Duration::from_secs(2));
        assert_eq!(
            BackoffPolicy::Fixed(Duration::from_millis(5)).delay(7),
            Duration::from_millis(5)
        );

        let custom =
            BackoffPolicy::custom(|attempt| Duration::from_millis(10 * (attempt as u64 + 1)));
        assert_eq!(custom.delay(2), Duration::from_millis(30));
    }
}
