//! Rolling success/failure statistics.
//!
//! The window spans `bucket_span * bucket_count`. Outcomes land in the newest
//! bucket; buckets older than the window fall off the front as time advances.
//! The breaker owns the window behind its mutex, so updates are serialized.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::resilience::types::WindowStats;

/// Upper bound on buckets per window. Larger requests are clamped.
pub const MAX_BUCKETS: usize = 1000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    successes: u64,
    failures: u64,
}

impl Bucket {
    fn new(started: Instant) -> Self {
        Self {
            started,
            successes: 0,
            failures: 0,
        }
    }
}

/// Time-bucketed counts of call outcomes.
#[derive(Debug)]
pub struct RollingWindow {
    buckets: VecDeque<Bucket>,
    bucket_span: Duration,
    bucket_count: usize,
    length: Duration,
}

impl RollingWindow {
    /// Create a window of `length` split into `bucket_count` buckets.
    ///
    /// `bucket_count` is clamped to `1..=MAX_BUCKETS`; each bucket spans at
    /// least one millisecond.
    pub fn new(length: Duration, bucket_count: usize) -> Self {
        let bucket_count = bucket_count.clamp(1, MAX_BUCKETS);
        let divisor = u32::try_from(bucket_count).unwrap_or(u32::MAX);
        let bucket_span = (length / divisor).max(Duration::from_millis(1));
        let length = bucket_span.checked_mul(divisor).unwrap_or(Duration::MAX);
        Self {
            buckets: VecDeque::with_capacity(bucket_count),
            bucket_span,
            bucket_count,
            length,
        }
    }

    pub fn record_success(&mut self, now: Instant) {
        self.current(now).successes += 1;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.current(now).failures += 1;
    }

    /// Sum of all buckets still inside the window at `now`.
    pub fn stats(&mut self, now: Instant) -> WindowStats {
        self.rotate(now);
        self.buckets.iter().fold(WindowStats::default(), |acc, b| WindowStats {
            successes: acc.successes + b.successes,
            failures: acc.failures + b.failures,
        })
    }

    /// Drop every observation.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    fn current(&mut self, now: Instant) -> &mut Bucket {
        self.rotate(now);
        if self.buckets.is_empty() {
            self.buckets.push_back(Bucket::new(now));
        }
        // Non-empty after the push above.
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    fn rotate(&mut self, now: Instant) {
        let Some(newest) = self.buckets.back().map(|b| b.started) else {
            return;
        };

        if now.saturating_duration_since(newest) >= self.length {
            // Idle longer than the whole window: nothing survives.
            self.buckets.clear();
            self.buckets.push_back(Bucket::new(now));
            return;
        }

        let mut start = newest;
        while now.saturating_duration_since(start) >= self.bucket_span {
            start += self.bucket_span;
            self.buckets.push_back(Bucket::new(start));
        }

        while self.buckets.len() > self.bucket_count {
            self.buckets.pop_front();
        }
    }
}
