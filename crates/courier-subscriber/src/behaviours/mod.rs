//! Pipeline behaviours and terminal steps
//!
//! | Name | Scope | Role |
//! |------|-------|------|
//! | `default` | message, batch | outermost; acknowledge or leave for redelivery |
//! | `non_transient_failure` | message | outermost; dead-letter permanent failures |
//! | `poison_message` | message | inner; dead-letter permanent failures, re-raise the rest |
//! | `circuit_breaker` | message, batch | fail fast while the dependency is unhealthy |
//! | `rate_limiter` | message, batch | throughput ceiling |
//! | `monitoring` | message | timing statistics |

pub mod circuit_breaker;
pub mod dead_letter;
pub mod default;
pub mod dispatch;
pub mod invoke_handler;
pub mod monitoring;
pub mod rate_limiter;

pub use circuit_breaker::CircuitBreakerBehaviour;
pub use dead_letter::{NonTransientFailureBehaviour, PoisonMessageBehaviour};
pub use default::{DefaultBatchBehaviour, DefaultBehaviour};
pub use dispatch::BatchDispatch;
pub use invoke_handler::InvokeHandler;
pub use monitoring::MonitoringBehaviour;
pub use rate_limiter::RateLimiterBehaviour;
