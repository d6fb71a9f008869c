//! Pipeline construction and eager validation.
//!
//! Both scopes are declared as ordered behaviour lists and validated when the
//! pipelines are built, so a bad configuration fails at startup rather than at
//! the first message:
//!
//! - a scope may not be empty
//! - each scope starts with exactly one disposing behaviour
//!   (`default` or `non_transient_failure` for messages, `default` for batches)
//! - no disposing behaviour appears after the first position
//! - behaviours needing shared state get it from the builder
//!
//! The terminal steps (handler dispatch, batch fan-out) are appended
//! implicitly and cannot be listed.

use super::{Behaviour, Pipeline};
use crate::behaviours::{
    BatchDispatch, CircuitBreakerBehaviour, DefaultBatchBehaviour, DefaultBehaviour,
    InvokeHandler, MonitoringBehaviour, NonTransientFailureBehaviour, PoisonMessageBehaviour,
    RateLimiterBehaviour,
};
use crate::context::{BatchContext, MessageContext};
use crate::domain::{CircuitBreaker, FailureClassifier, RateLimiter};
use crate::error::ConfigError;
use crate::handler::HandlerRegistry;
use crate::ports::StatisticsReporter;
use std::fmt;
use std::sync::Arc;

/// Pipeline scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Runs once per message
    Message,
    /// Runs once per received batch
    Batch,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Message => "message",
            Scope::Batch => "batch",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviours that can be declared in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviourKind {
    Default,
    NonTransientFailure,
    PoisonMessage,
    CircuitBreaker,
    RateLimiter,
    Monitoring,
}

impl BehaviourKind {
    const ALL: [BehaviourKind; 6] = [
        BehaviourKind::Default,
        BehaviourKind::NonTransientFailure,
        BehaviourKind::PoisonMessage,
        BehaviourKind::CircuitBreaker,
        BehaviourKind::RateLimiter,
        BehaviourKind::Monitoring,
    ];

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            BehaviourKind::Default => DefaultBehaviour::NAME,
            BehaviourKind::NonTransientFailure => NonTransientFailureBehaviour::NAME,
            BehaviourKind::PoisonMessage => PoisonMessageBehaviour::NAME,
            BehaviourKind::CircuitBreaker => CircuitBreakerBehaviour::NAME,
            BehaviourKind::RateLimiter => RateLimiterBehaviour::NAME,
            BehaviourKind::Monitoring => MonitoringBehaviour::NAME,
        }
    }

    /// Parse a configuration name for `scope`.
    pub fn parse(scope: Scope, name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name && kind.allowed_in(scope))
            .ok_or_else(|| ConfigError::UnknownBehaviour {
                scope: scope.as_str(),
                name: name.to_string(),
            })
    }

    /// Whether this behaviour settles messages.
    pub fn is_disposing(&self) -> bool {
        matches!(
            self,
            BehaviourKind::Default | BehaviourKind::NonTransientFailure
        )
    }

    /// Whether this behaviour may be declared in `scope`.
    pub fn allowed_in(&self, scope: Scope) -> bool {
        match scope {
            Scope::Message => true,
            Scope::Batch => matches!(
                self,
                BehaviourKind::Default | BehaviourKind::CircuitBreaker | BehaviourKind::RateLimiter
            ),
        }
    }
}

impl fmt::Display for BehaviourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared behaviour order for both scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    message: Vec<BehaviourKind>,
    batch: Vec<BehaviourKind>,
}

impl PipelineDefinition {
    /// Declare both scopes, outermost first. Validated by [`validate`](Self::validate).
    pub fn new(message: Vec<BehaviourKind>, batch: Vec<BehaviourKind>) -> Self {
        Self { message, batch }
    }

    /// Parse behaviour names from configuration.
    pub fn from_names<M, B>(message: M, batch: B) -> Result<Self, ConfigError>
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        let message = message
            .into_iter()
            .map(|name| BehaviourKind::parse(Scope::Message, name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = batch
            .into_iter()
            .map(|name| BehaviourKind::parse(Scope::Batch, name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(message, batch))
    }

    /// `[default, circuit_breaker]` in both scopes, sharing one breaker.
    pub fn default_with_circuit_breaker() -> Self {
        Self::new(
            vec![BehaviourKind::Default, BehaviourKind::CircuitBreaker],
            vec![BehaviourKind::Default, BehaviourKind::CircuitBreaker],
        )
    }

    pub fn message(&self) -> &[BehaviourKind] {
        &self.message
    }

    pub fn batch(&self) -> &[BehaviourKind] {
        &self.batch
    }

    /// Check both scopes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_scope(Scope::Message, &self.message)?;
        validate_scope(Scope::Batch, &self.batch)?;

        // The batch breaker only gates; outcomes come from the message scope.
        if self.batch.contains(&BehaviourKind::CircuitBreaker)
            && !self.message.contains(&BehaviourKind::CircuitBreaker)
        {
            return Err(ConfigError::UnrecordedCircuitBreaker);
        }
        Ok(())
    }

    /// Whether any scope uses `kind`.
    pub fn uses(&self, kind: BehaviourKind) -> bool {
        self.message.contains(&kind) || self.batch.contains(&kind)
    }
}

impl Default for PipelineDefinition {
    fn default() -> Self {
        Self::new(vec![BehaviourKind::Default], vec![BehaviourKind::Default])
    }
}

fn validate_scope(scope: Scope, kinds: &[BehaviourKind]) -> Result<(), ConfigError> {
    let Some(first) = kinds.first() else {
        return Err(ConfigError::EmptyPipeline {
            scope: scope.as_str(),
        });
    };

    for kind in kinds {
        if !kind.allowed_in(scope) {
            return Err(ConfigError::UnknownBehaviour {
                scope: scope.as_str(),
                name: kind.name().to_string(),
            });
        }
    }

    match scope {
        // The outermost message behaviour settles every message.
        Scope::Message => {
            if !first.is_disposing() {
                return Err(ConfigError::MissingDisposition {
                    scope: scope.as_str(),
                    found: first.name().to_string(),
                });
            }
            if let Some((position, kind)) = kinds
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, kind)| kind.is_disposing())
            {
                return Err(ConfigError::MisplacedDisposition {
                    scope: scope.as_str(),
                    name: kind.name().to_string(),
                    position,
                });
            }
        }
        // The batch default settles nothing, so gates may wrap it.
        Scope::Batch => {
            let mut defaults = kinds
                .iter()
                .enumerate()
                .filter(|(_, kind)| **kind == BehaviourKind::Default);
            if defaults.next().is_none() {
                return Err(ConfigError::MissingDisposition {
                    scope: scope.as_str(),
                    found: first.name().to_string(),
                });
            }
            if let Some((position, kind)) = defaults.next() {
                return Err(ConfigError::MisplacedDisposition {
                    scope: scope.as_str(),
                    name: kind.name().to_string(),
                    position,
                });
            }
        }
    }

    Ok(())
}

/// Both built pipelines. The batch pipeline's terminal feeds the message
/// pipeline.
#[derive(Debug, Clone)]
pub struct Pipelines {
    pub message: Arc<Pipeline<MessageContext>>,
    pub batch: Arc<Pipeline<BatchContext>>,
}

/// Builds [`Pipelines`] from a [`PipelineDefinition`] and shared components.
pub struct PipelineBuilder {
    definition: PipelineDefinition,
    handlers: Option<Arc<HandlerRegistry>>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    classifier: Arc<FailureClassifier>,
    statistics: Option<Arc<dyn StatisticsReporter>>,
}

impl PipelineBuilder {
    pub fn new(definition: PipelineDefinition) -> Self {
        Self {
            definition,
            handlers: None,
            circuit_breaker: None,
            rate_limiter: None,
            classifier: Arc::new(FailureClassifier::with_defaults()),
            statistics: None,
        }
    }

    /// Handlers for the invoke-handler terminal. Required.
    #[must_use]
    pub fn with_handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Breaker shared by every `circuit_breaker` entry in both scopes.
    #[must_use]
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Limiter shared by every `rate_limiter` entry in both scopes.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Classifier for the dead-lettering behaviours.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sink for the `monitoring` behaviour.
    #[must_use]
    pub fn with_statistics(mut self, statistics: Arc<dyn StatisticsReporter>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Validate the definition and assemble both pipelines.
    pub fn build(self) -> Result<Pipelines, ConfigError> {
        self.definition.validate()?;

        let handlers = self
            .handlers
            .clone()
            .ok_or_else(|| ConfigError::MissingComponent("invoke_handler".into()))?;

        let message_behaviours = self
            .definition
            .message()
            .iter()
            .map(|kind| self.message_behaviour(*kind))
            .collect::<Result<Vec<_>, _>>()?;
        let message = Arc::new(Pipeline::new(
            message_behaviours,
            Arc::new(InvokeHandler::new(handlers)),
        ));

        let batch_behaviours = self
            .definition
            .batch()
            .iter()
            .map(|kind| self.batch_behaviour(*kind))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = Arc::new(Pipeline::new(
            batch_behaviours,
            Arc::new(BatchDispatch::new(Arc::clone(&message))),
        ));

        Ok(Pipelines { message, batch })
    }

    fn message_behaviour(
        &self,
        kind: BehaviourKind,
    ) -> Result<Arc<dyn Behaviour<MessageContext>>, ConfigError> {
        Ok(match kind {
            BehaviourKind::Default => Arc::new(DefaultBehaviour),
            BehaviourKind::NonTransientFailure => {
                Arc::new(NonTransientFailureBehaviour::new(self.classifier.clone()))
            }
            BehaviourKind::PoisonMessage => {
                Arc::new(PoisonMessageBehaviour::new(self.classifier.clone()))
            }
            BehaviourKind::CircuitBreaker => {
                Arc::new(CircuitBreakerBehaviour::new(self.breaker(kind)?))
            }
            BehaviourKind::RateLimiter => Arc::new(RateLimiterBehaviour::new(self.limiter(kind)?)),
            BehaviourKind::Monitoring => {
                let statistics = self
                    .statistics
                    .clone()
                    .ok_or_else(|| ConfigError::MissingComponent(kind.name().into()))?;
                Arc::new(MonitoringBehaviour::new(statistics))
            }
        })
    }

    fn batch_behaviour(
        &self,
        kind: BehaviourKind,
    ) -> Result<Arc<dyn Behaviour<BatchContext>>, ConfigError> {
        Ok(match kind {
            BehaviourKind::Default => Arc::new(DefaultBatchBehaviour),
            BehaviourKind::CircuitBreaker => {
                Arc::new(CircuitBreakerBehaviour::new(self.breaker(kind)?))
            }
            BehaviourKind::RateLimiter => Arc::new(RateLimiterBehaviour::new(self.limiter(kind)?)),
            other => {
                return Err(ConfigError::UnknownBehaviour {
                    scope: Scope::Batch.as_str(),
                    name: other.name().to_string(),
                })
            }
        })
    }

    fn breaker(&self, kind: BehaviourKind) -> Result<Arc<CircuitBreaker>, ConfigError> {
        self.circuit_breaker
            .clone()
            .ok_or_else(|| ConfigError::MissingComponent(kind.name().into()))
    }

    fn limiter(&self, kind: BehaviourKind) -> Result<Arc<RateLimiter>, ConfigError> {
        self.rate_limiter
            .clone()
            .ok_or_else(|| ConfigError::MissingComponent(kind.name().into()))
    }
}
