//! Circuit breaker for outbound dependency protection.
//!
//! # States
//! - Closed: calls pass through, outcomes feed the rolling window
//! - Open: calls are rejected without reaching the dependency
//! - Half-Open: exactly one trial call probes the dependency
//!
//! # State Transitions
//! ```text
//! Closed → Open: window volume >= volume_threshold and
//!                error percentage >= error_threshold_percentage
//! Open → Half-Open: reset_timeout elapsed since the trip
//! Half-Open → Closed: trial call succeeds (window cleared)
//! Half-Open → Open: trial call fails (reset timer restarts)
//! ```
//!
//! All bookkeeping happens under one mutex that is never held across an
//! `.await`, so transitions are totally ordered and concurrent outcome
//! reports are never lost. Every transition is broadcast as a
//! [`StateChange`]; sending never blocks and ignores missing subscribers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::resilience::types::{CircuitEvent, CircuitState, StateChange, WindowStats};
use crate::resilience::window::RollingWindow;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Breaker thresholds.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Failure rate (percent) that trips the breaker.
    pub error_threshold_percentage: f64,
    /// How long the breaker stays open before allowing a probe.
    pub reset_timeout: Duration,
    /// Minimum observations before the failure rate is evaluated.
    ///
    /// The percentage rule only applies once the window holds this many
    /// outcomes. Below it the breaker stays closed even at 100% failures.
    pub volume_threshold: u64,
    /// Length of the statistics window.
    pub rolling_window: Duration,
    /// Number of buckets in the statistics window.
    pub rolling_buckets: usize,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 50.0,
            reset_timeout: Duration::from_secs(30),
            volume_threshold: 5,
            rolling_window: Duration::from_secs(10),
            rolling_buckets: 10,
        }
    }
}

/// Result of asking the breaker whether a call may proceed.
#[derive(Debug)]
pub enum Admission {
    /// Normal pass-through while closed.
    Allowed,
    /// The single half-open probe. Must be resolved via the breaker.
    Trial(TrialPermit),
    /// Breaker is open (or a probe is already in flight).
    Rejected,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    window: RollingWindow,
    trial_in_flight: bool,
}

/// Circuit breaker shared by every caller of one remote operation.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: Arc<str>,
    settings: BreakerSettings,
    inner: Mutex<BreakerState>,
    events: broadcast::Sender<StateChange>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<Arc<str>>, settings: BreakerSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let window = RollingWindow::new(settings.rolling_window, settings.rolling_buckets);
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window,
                trial_in_flight: false,
            }),
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Current state. Does not move Open to Half-Open; only admission does.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current window statistics.
    pub fn stats(&self) -> WindowStats {
        self.lock().window.stats(Instant::now())
    }

    /// Decide whether a call may reach the dependency.
    pub fn try_acquire(self: &Arc<Self>) -> Admission {
        let now = Instant::now();
        let mut inner = self.lock();
        let state = inner.state;

        match state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open { since } => {
                if now.saturating_duration_since(since) < self.settings.reset_timeout {
                    return Admission::Rejected;
                }
                self.transition(
                    &mut inner,
                    CircuitState::HalfOpen,
                    CircuitEvent::HalfOpen,
                    now,
                );
                inner.trial_in_flight = true;
                Admission::Trial(TrialPermit::new(self.clone()))
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Admission::Rejected
                } else {
                    inner.trial_in_flight = true;
                    Admission::Trial(TrialPermit::new(self.clone()))
                }
            }
        }
    }

    /// Record a successful pass-through call.
    pub fn record_success(&self) {
        let now = Instant::now();
        self.lock().window.record_success(now);
    }

    /// Record a failed pass-through call; may trip the breaker.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.window.record_failure(now);

        if inner.state != CircuitState::Closed {
            return;
        }

        let stats = inner.window.stats(now);
        if stats.total() >= self.settings.volume_threshold.max(1)
            && stats.error_percentage() >= self.settings.error_threshold_percentage
        {
            tracing::debug!(
                breaker = %self.name,
                failures = stats.failures,
                total = stats.total(),
                "Failure threshold reached"
            );
            self.transition(
                &mut inner,
                CircuitState::Open { since: now },
                CircuitEvent::Open,
                now,
            );
        }
    }

    /// Force the breaker closed and forget all observations.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.trial_in_flight = false;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed, CircuitEvent::Close, now);
        }
        inner.window.clear();
    }

    fn finish_trial(&self, succeeded: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.trial_in_flight = false;

        if succeeded {
            inner.window.record_success(now);
            if inner.state == CircuitState::HalfOpen {
                self.transition(&mut inner, CircuitState::Closed, CircuitEvent::Close, now);
            }
        } else {
            inner.window.record_failure(now);
            if inner.state == CircuitState::HalfOpen {
                self.transition(
                    &mut inner,
                    CircuitState::Open { since: now },
                    CircuitEvent::Open,
                    now,
                );
            }
        }
    }

    fn release_trial(&self) {
        self.lock().trial_in_flight = false;
    }

    fn transition(
        &self,
        inner: &mut MutexGuard<'_, BreakerState>,
        to: CircuitState,
        event: CircuitEvent,
        at: Instant,
    ) {
        let from = inner.state;
        inner.state = to;
        if to == CircuitState::Closed {
            inner.window.clear();
        }

        tracing::debug!(breaker = %self.name, from = %from, to = %to, "Circuit state changed");

        // No subscribers is fine.
        let _ = self.events.send(StateChange {
            breaker: self.name.clone(),
            from,
            to,
            event,
            at,
        });
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The half-open probe slot.
///
/// Resolve it with [`TrialPermit::succeed`] or [`TrialPermit::fail`]. Dropping
/// it unresolved (the caller gave up) frees the slot for the next caller
/// without changing state.
#[derive(Debug)]
pub struct TrialPermit {
    breaker: Arc<CircuitBreaker>,
    resolved: bool,
}

impl TrialPermit {
    fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            breaker,
            resolved: false,
        }
    }

    pub fn succeed(mut self) {
        self.resolved = true;
        self.breaker.finish_trial(true);
    }

    pub fn fail(mut self) {
        self.resolved = true;
        self.breaker.finish_trial(false);
    }
}

impl Drop for TrialPermit {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.release_trial();
        }
    }
}
