//! Circuit breaker shared by every pipeline invocation of a subscriber.
//!
//! Stops calling a failing dependency for a cooldown period, then admits a
//! single probe before resuming normal traffic.
//!
//! # Circuit Breaker States
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    CIRCUIT BREAKER STATE MACHINE                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │      ┌──────────┐ threshold ┌──────────┐ interval  ┌──────────┐     │
//! │      │  CLOSED  │ ────────► │   OPEN   │ ────────► │ TESTING  │     │
//! │      │  (pass)  │  matched  │ (reject) │  elapsed  │ (1 probe)│     │
//! │      └──────────┘           └──────────┘           └──────────┘     │
//! │            ▲                      ▲                      │          │
//! │            │                      └──── probe matched ───┤          │
//! │            └───────────── probe succeeded ───────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//!
//! - `test_interval`: time spent Open before a probe is admitted (default: 30s)
//! - `failure_threshold`: matching failures that open the circuit (default: 1)
//! - `failure_window`: window the threshold is counted over (default: 60s)
//! - predicate: which errors count as failures of the dependency
//!
//! All transitions happen under one lock. Monitor callbacks run after the
//! lock is released, once per committed transition.

use crate::error::{ConfigError, ProcessingError};
use crate::ports::CircuitMonitor;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Decides whether an error counts against the protected dependency.
pub type FailurePredicate = Arc<dyn Fn(&ProcessingError) -> bool + Send + Sync>;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - calls pass through
    Closed,
    /// Calls are rejected immediately
    Open,
    /// One probe call is in flight
    Testing,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::Testing => write!(f, "testing"),
        }
    }
}

/// Rejection returned by [`CircuitBreaker::acquire`] while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen;

impl From<CircuitOpen> for ProcessingError {
    fn from(_: CircuitOpen) -> Self {
        ProcessingError::CircuitOpen
    }
}

/// Circuit breaker options
#[derive(Clone)]
pub struct CircuitBreakerOptions {
    test_interval: Duration,
    failure_threshold: u32,
    failure_window: Duration,
    predicate: FailurePredicate,
    monitor: Option<Arc<dyn CircuitMonitor>>,
}

impl CircuitBreakerOptions {
    /// Break on errors matching `predicate`, probing after `test_interval`.
    pub fn new<F>(test_interval: Duration, predicate: F) -> Self
    where
        F: Fn(&ProcessingError) -> bool + Send + Sync + 'static,
    {
        Self {
            test_interval,
            failure_threshold: 1,
            failure_window: Duration::from_secs(60),
            predicate: Arc::new(predicate),
            monitor: None,
        }
    }

    /// Break on errors whose kind tag is one of `kinds`.
    pub fn trip_on_kinds<I>(test_interval: Duration, kinds: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let kinds: HashSet<String> = kinds.into_iter().map(Into::into).collect();
        Self::new(test_interval, move |error| kinds.contains(error.kind()))
    }

    /// Matching failures needed within the window to open the circuit.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Window the failure threshold is counted over.
    #[must_use]
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Sink for transition notifications.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<dyn CircuitMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Time spent Open before a probe is admitted.
    pub fn test_interval(&self) -> Duration {
        self.test_interval
    }

    /// Matching failures that open the circuit.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidCircuitBreaker(
                "failure_threshold must be at least 1".into(),
            ));
        }
        if self.failure_window.is_zero() {
            return Err(ConfigError::InvalidCircuitBreaker(
                "failure_window must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for CircuitBreakerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerOptions")
            .field("test_interval", &self.test_interval)
            .field("failure_threshold", &self.failure_threshold)
            .field("failure_window", &self.failure_window)
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

/// Committed transition, reported after the lock is released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Broken,
    Reset,
    Testing,
}

struct BreakerCore {
    state: CircuitState,
    /// Matching failures in the current window
    failure_count: u32,
    window_started: Option<Instant>,
    opened_at: Option<Instant>,
    last_transition: Instant,
    /// Incremented on every Open -> Testing; identifies the live probe
    probe_generation: u64,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            window_started: None,
            opened_at: None,
            last_transition: Instant::now(),
            probe_generation: 0,
        }
    }

    fn open(&mut self, now: Instant) -> Transition {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.last_transition = now;
        self.failure_count = 0;
        self.window_started = None;
        Transition::Broken
    }

    fn close(&mut self, now: Instant) -> Transition {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.last_transition = now;
        self.failure_count = 0;
        self.window_started = None;
        Transition::Reset
    }

    fn is_live_probe(&self, generation: Option<u64>) -> bool {
        self.state == CircuitState::Testing && generation == Some(self.probe_generation)
    }
}

/// Admission granted by [`CircuitBreaker::acquire`].
///
/// Hand it back through [`CircuitBreaker::record`]. A probe permit dropped
/// without an outcome returns the breaker to Open so a later call can probe;
/// monitors see that as a break.
#[must_use = "a permit must be recorded with the call outcome"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe_generation: Option<u64>,
    settled: bool,
}

impl Permit<'_> {
    /// Whether this permit admitted the probe call.
    pub fn is_probe(&self) -> bool {
        self.probe_generation.is_some()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.settled || self.probe_generation.is_none() {
            return;
        }
        let reverted = {
            let mut core = self.breaker.core.lock();
            if core.is_live_probe(self.probe_generation) {
                // opened_at is kept so the next caller probes immediately
                core.state = CircuitState::Open;
                core.last_transition = Instant::now();
                debug!("Circuit breaker probe abandoned, reverting to open");
                Some(Transition::Broken)
            } else {
                None
            }
        };
        self.breaker.notify(reverted);
    }
}

/// Three-state circuit breaker
pub struct CircuitBreaker {
    core: Mutex<BreakerCore>,
    options: CircuitBreakerOptions,
}

impl CircuitBreaker {
    /// Create a closed circuit breaker.
    pub fn new(options: CircuitBreakerOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            core: Mutex::new(BreakerCore::new()),
            options,
        })
    }

    /// Options this breaker was built with.
    pub fn options(&self) -> &CircuitBreakerOptions {
        &self.options
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.core.lock().state
    }

    /// Time since the last state transition.
    pub fn time_in_state(&self) -> Duration {
        self.core.lock().last_transition.elapsed()
    }

    /// Whether `error` counts against the protected dependency.
    pub fn is_failure(&self, error: &ProcessingError) -> bool {
        !error.is_circuit_open() && (self.options.predicate)(error)
    }

    /// Ask to run a call.
    ///
    /// Closed admits every call. Open rejects until the test interval has
    /// elapsed, then admits exactly one probe and moves to Testing. Testing
    /// rejects everything but the probe already admitted.
    pub fn acquire(&self) -> Result<Permit<'_>, CircuitOpen> {
        let (result, transition) = {
            let mut core = self.core.lock();
            match core.state {
                CircuitState::Closed => (Ok(None), None),
                CircuitState::Open => {
                    let now = Instant::now();
                    let elapsed = core
                        .opened_at
                        .map(|opened_at| now.saturating_duration_since(opened_at))
                        .unwrap_or(self.options.test_interval);
                    if elapsed >= self.options.test_interval {
                        core.state = CircuitState::Testing;
                        core.last_transition = now;
                        core.probe_generation = core.probe_generation.wrapping_add(1);
                        (Ok(Some(core.probe_generation)), Some(Transition::Testing))
                    } else {
                        debug!(
                            remaining_ms = (self.options.test_interval - elapsed).as_millis() as u64,
                            "Circuit breaker is open, rejecting call"
                        );
                        (Err(CircuitOpen), None)
                    }
                }
                CircuitState::Testing => (Err(CircuitOpen), None),
            }
        };

        self.notify(transition);
        result.map(|probe_generation| Permit {
            breaker: self,
            probe_generation,
            settled: false,
        })
    }

    /// Check admission without taking a permit or changing state.
    ///
    /// Used by the batch scope: once the test interval has elapsed the batch
    /// is let through so one of its messages can take the probe. Testing
    /// rejects, since the probe is already out.
    pub fn gate(&self) -> Result<(), CircuitOpen> {
        let core = self.core.lock();
        match core.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = core
                    .opened_at
                    .map(|opened_at| Instant::now().saturating_duration_since(opened_at))
                    .unwrap_or(self.options.test_interval);
                if elapsed >= self.options.test_interval {
                    Ok(())
                } else {
                    Err(CircuitOpen)
                }
            }
            CircuitState::Testing => Err(CircuitOpen),
        }
    }

    /// Record the outcome of an admitted call.
    pub fn record(&self, mut permit: Permit<'_>, outcome: &Result<(), ProcessingError>) {
        permit.settled = true;
        let matched = match outcome {
            Ok(()) => false,
            Err(error) => self.is_failure(error),
        };

        let transition = {
            let mut core = self.core.lock();
            let now = Instant::now();

            if permit.is_probe() {
                if !core.is_live_probe(permit.probe_generation) {
                    None
                } else if matched {
                    debug!("Circuit breaker probe failed, reopening");
                    Some(core.open(now))
                } else {
                    debug!("Circuit breaker probe completed, closing");
                    Some(core.close(now))
                }
            } else if core.state != CircuitState::Closed {
                // Admitted before the circuit opened; only the probe decides now.
                None
            } else if matched {
                let window_expired = core
                    .window_started
                    .map(|started| now.saturating_duration_since(started) > self.options.failure_window)
                    .unwrap_or(true);
                if window_expired {
                    core.window_started = Some(now);
                    core.failure_count = 0;
                }
                core.failure_count += 1;

                if core.failure_count >= self.options.failure_threshold {
                    debug!(
                        failures = core.failure_count,
                        threshold = self.options.failure_threshold,
                        "Circuit breaker opening due to failures"
                    );
                    Some(core.open(now))
                } else {
                    None
                }
            } else {
                if outcome.is_ok() {
                    core.failure_count = 0;
                    core.window_started = None;
                }
                None
            }
        };

        self.notify(transition);
    }

    /// Force the circuit closed (admin / tests).
    pub fn force_reset(&self) {
        let transition = {
            let mut core = self.core.lock();
            if core.state == CircuitState::Closed {
                None
            } else {
                Some(core.close(Instant::now()))
            }
        };
        self.notify(transition);
    }

    fn notify(&self, transition: Option<Transition>) {
        let (Some(transition), Some(monitor)) = (transition, self.options.monitor.as_ref()) else {
            return;
        };
        match transition {
            Transition::Broken => monitor.on_broken(),
            Transition::Reset => monitor.on_reset(),
            Transition::Testing => monitor.on_testing(),
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}
