//! Subscriber configuration with validation.
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration. Loaded once at startup and never mutated afterwards.

use crate::domain::{
    CircuitBreakerOptions, FailureClassifier, RateLimiterConfiguration,
};
use crate::error::ConfigError;
use crate::pipeline::PipelineDefinition;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Subscription name, also used in logs
    pub subscriber_name: String,
    /// Topic the subscription belongs to
    pub topic: String,
    /// Batch intake
    pub intake: IntakeConfig,
    /// Behaviour order per scope
    pub pipeline: PipelineConfig,
    /// Circuit breaker
    pub circuit_breaker: CircuitBreakerConfig,
    /// Rate limiter
    pub rate_limiter: RateLimiterConfig,
    /// Failure classification
    pub failures: FailuresConfig,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            subscriber_name: "CourierSubscriber".into(),
            topic: "courier".into(),
            intake: IntakeConfig::default(),
            pipeline: PipelineConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            failures: FailuresConfig::default(),
        }
    }
}

impl SubscriberConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake.batch_size == 0 {
            return Err(ConfigError::InvalidIntake("batch_size cannot be 0".into()));
        }
        if self.intake.max_concurrent_batches == 0 {
            return Err(ConfigError::InvalidIntake(
                "max_concurrent_batches cannot be 0".into(),
            ));
        }

        let definition = self.pipeline_definition()?;
        definition.validate()?;

        if self.rate_limiter.permits_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "permits_per_second cannot be 0".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidCircuitBreaker(
                "failure_threshold cannot be 0".into(),
            ));
        }
        if self.circuit_breaker.failure_window_secs == 0 {
            return Err(ConfigError::InvalidCircuitBreaker(
                "failure_window_secs cannot be 0".into(),
            ));
        }

        self.classifier()?;
        Ok(())
    }

    /// Parsed behaviour order.
    pub fn pipeline_definition(&self) -> Result<PipelineDefinition, ConfigError> {
        PipelineDefinition::from_names(&self.pipeline.message, &self.pipeline.batch)
    }

    /// Classifier built from the `[failures]` lists.
    ///
    /// `MalformedPayload` is permanent unless listed as transient.
    pub fn classifier(&self) -> Result<FailureClassifier, ConfigError> {
        Ok(FailureClassifier::new(
            self.failures.permanent.iter().cloned(),
            self.failures.transient.iter().cloned(),
        )?
        .with_malformed_payload_permanent())
    }

    /// Breaker options tripping on the `trip_on` kinds.
    pub fn circuit_breaker_options(&self) -> CircuitBreakerOptions {
        let cb = &self.circuit_breaker;
        CircuitBreakerOptions::trip_on_kinds(cb.test_interval(), cb.trip_on.iter().cloned())
            .with_failure_threshold(cb.failure_threshold)
            .with_failure_window(Duration::from_secs(cb.failure_window_secs))
    }

    /// Rate limiter ceiling.
    pub fn rate_limiter_configuration(&self) -> RateLimiterConfiguration {
        RateLimiterConfiguration::new(self.rate_limiter.permits_per_second)
    }
}

/// Batch intake configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Maximum messages per receive
    pub batch_size: usize,
    /// Longest wait for the first message of a batch, in milliseconds
    pub receive_wait_ms: u64,
    /// Batches processed at the same time
    pub max_concurrent_batches: usize,
}

impl IntakeConfig {
    pub fn receive_wait(&self) -> Duration {
        Duration::from_millis(self.receive_wait_ms)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            receive_wait_ms: 1000,
            max_concurrent_batches: 4,
        }
    }
}

/// Behaviour order, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Message scope behaviours
    pub message: Vec<String>,
    /// Batch scope behaviours
    pub batch: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            message: vec!["default".into()],
            batch: vec!["default".into()],
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Seconds spent open before a probe is admitted (default: 30)
    pub test_interval_secs: u64,
    /// Matching failures that open the circuit (default: 1)
    pub failure_threshold: u32,
    /// Window the threshold is counted over, in seconds (default: 60)
    pub failure_window_secs: u64,
    /// Error kinds that count against the dependency
    pub trip_on: Vec<String>,
}

impl CircuitBreakerConfig {
    pub fn test_interval(&self) -> Duration {
        Duration::from_secs(self.test_interval_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            test_interval_secs: 30,
            failure_threshold: 1,
            failure_window_secs: 60,
            trip_on: vec!["ExternalProviderOffline".into()],
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Permits per second (default: 32)
    pub permits_per_second: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            permits_per_second: 32,
        }
    }
}

/// Failure classification lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailuresConfig {
    /// Kinds that can never succeed on retry
    pub permanent: Vec<String>,
    /// Kinds worth redelivering
    pub transient: Vec<String>,
}
