//! Domain layer: shared state machines and classification used by behaviours.

pub mod circuit_breaker;
pub mod classifier;
pub mod rate_limiter;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerOptions, CircuitOpen, CircuitState, FailurePredicate, Permit,
};
pub use classifier::{FailureClassifier, FailureKind};
pub use rate_limiter::{RateLimiter, RateLimiterConfiguration};
