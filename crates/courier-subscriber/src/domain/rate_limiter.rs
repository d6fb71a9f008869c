//! Throughput ceiling shared across concurrent pipeline invocations.
//!
//! GCRA via `governor` with a burst of one, so admissions are spaced by
//! `1s / permits_per_second` and no rolling one-second window ever sees more
//! than the ceiling. Waiters queue on a FIFO mutex before asking the limiter,
//! so admission order follows arrival order under contention.

use crate::error::ConfigError;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota,
};
use std::num::NonZeroU32;
use tokio::sync::Mutex;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfiguration {
    /// Permits granted per second
    pub permits_per_second: u32,
}

impl RateLimiterConfiguration {
    /// Ceiling of `permits_per_second`.
    pub fn new(permits_per_second: u32) -> Self {
        Self { permits_per_second }
    }
}

impl Default for RateLimiterConfiguration {
    fn default() -> Self {
        Self::new(32)
    }
}

/// Shared, fair, blocking rate limiter
pub struct RateLimiter {
    limiter: DirectLimiter,
    queue: Mutex<()>,
    config: RateLimiterConfiguration,
}

impl RateLimiter {
    /// Create a limiter. A ceiling of zero is rejected.
    pub fn new(config: RateLimiterConfiguration) -> Result<Self, ConfigError> {
        let rate = NonZeroU32::new(config.permits_per_second).ok_or_else(|| {
            ConfigError::InvalidRateLimit("permits_per_second must be at least 1".into())
        })?;
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);

        Ok(Self {
            limiter: DirectLimiter::direct(quota),
            queue: Mutex::new(()),
            config,
        })
    }

    /// Configured ceiling.
    pub fn configuration(&self) -> RateLimiterConfiguration {
        self.config
    }

    /// Wait for one permit. Suspends, never fails.
    pub async fn acquire(&self) {
        let _turn = self.queue.lock().await;
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("permits_per_second", &self.config.permits_per_second)
            .finish()
    }
}
