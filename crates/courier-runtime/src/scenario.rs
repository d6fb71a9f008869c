//! # Demo Scenarios
//!
//! Each scenario pairs a pipeline configuration with a failure plan for the
//! sample handler and a publishing pattern.

use crate::handlers::{FailurePlan, EXTERNAL_PROVIDER_OFFLINE, SAMPLE_PERMANENT, SAMPLE_TRANSIENT};
use clap::ValueEnum;
use courier_subscriber::SubscriberConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Handle every message and acknowledge it
    Hello,
    /// Trip the circuit on `ExternalProviderOffline` and probe after 30s
    CircuitBreaking,
    /// Cap throughput at 32 messages per second
    RateLimiting,
    /// Dead-letter permanent failures from an inner behaviour
    PoisonMessages,
    /// Dead-letter permanent failures from the outermost behaviour
    NonTransient,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::CircuitBreaking => "circuit-breaking",
            Self::RateLimiting => "rate-limiting",
            Self::PoisonMessages => "poison-messages",
            Self::NonTransient => "non-transient",
        }
    }

    /// Preset subscriber configuration.
    pub fn config(&self) -> SubscriberConfig {
        let mut config = SubscriberConfig {
            subscriber_name: "CourierExampleSubscriber".into(),
            ..SubscriberConfig::default()
        };
        let names = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        match self {
            Self::Hello => {
                config.pipeline.message = names(&["default", "monitoring"]);
            }
            Self::CircuitBreaking => {
                config.pipeline.message = names(&["default", "circuit_breaker", "monitoring"]);
                config.pipeline.batch = names(&["default", "circuit_breaker"]);
                config.circuit_breaker.trip_on = names(&[EXTERNAL_PROVIDER_OFFLINE]);
            }
            Self::RateLimiting => {
                config.pipeline.message = names(&["default", "rate_limiter", "monitoring"]);
                config.pipeline.batch = names(&["rate_limiter", "default"]);
            }
            Self::PoisonMessages => {
                config.pipeline.message = names(&["default", "poison_message", "monitoring"]);
            }
            Self::NonTransient => {
                config.pipeline.message = names(&["non_transient_failure", "monitoring"]);
            }
        }

        if matches!(self, Self::PoisonMessages | Self::NonTransient) {
            config.failures.permanent = names(&[SAMPLE_PERMANENT]);
            config.failures.transient = names(&[SAMPLE_TRANSIENT]);
        }
        config
    }

    pub fn failure_plan(&self) -> FailurePlan {
        match self {
            Self::Hello | Self::RateLimiting => FailurePlan::Never,
            Self::CircuitBreaking => FailurePlan::ProviderOffline {
                period: 60,
                outage: 10,
            },
            Self::PoisonMessages | Self::NonTransient => FailurePlan::Mixed,
        }
    }

    /// Publish an undecodable `Foo` every this many messages.
    pub fn malformed_every(&self) -> Option<u64> {
        match self {
            Self::PoisonMessages | Self::NonTransient => Some(7),
            _ => None,
        }
    }
}
