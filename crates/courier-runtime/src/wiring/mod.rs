//! # Subscriber Wiring
//!
//! Connects the in-memory transport, the pipeline components and the
//! monitoring adapters into a ready-to-run [`Subscriber`].
//!
//! ```text
//! SubscriberConfig ──► PipelineDefinition ──► PipelineBuilder ──► Pipelines
//!                         │                      ▲   ▲   ▲
//!                         │    CircuitBreaker ───┘   │   └── PrometheusStatistics
//!                         │    (tracing + prometheus │
//!                         │     monitors)            └────── RateLimiter
//!                         ▼
//! InMemoryTopic ──subscribe──► Subscription (source + receiver) ──► Subscriber
//! ```

use crate::adapters::{PrometheusCircuitMonitor, PrometheusStatistics};
use courier_subscriber::{
    BehaviourKind, CircuitBreaker, CompositeMonitor, ConfigError, HandlerRegistry,
    ListenSummary, PipelineBuilder, RateLimiter, Subscriber, SubscriberConfig,
    TracingCircuitMonitor,
};
use courier_telemetry::PipelineMetrics;
use shared_bus::{InMemoryTopic, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// A fully wired subscriber and the components worth inspecting.
pub struct SubscriberHost {
    subscriber: Subscriber,
    subscription: Subscription,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    metrics: PipelineMetrics,
}

impl SubscriberHost {
    /// Validate `config` and wire a subscriber for it on `topic`.
    ///
    /// Breaker and limiter are only created when a scope lists them; a
    /// single instance is shared by both scopes.
    pub fn build(
        config: &SubscriberConfig,
        handlers: HandlerRegistry,
        topic: &InMemoryTopic,
        metrics: PipelineMetrics,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let definition = config.pipeline_definition()?;

        let mut builder = PipelineBuilder::new(definition.clone())
            .with_handlers(Arc::new(handlers))
            .with_classifier(Arc::new(config.classifier()?))
            .with_statistics(Arc::new(PrometheusStatistics::new(metrics.clone())));

        let circuit_breaker = if definition.uses(BehaviourKind::CircuitBreaker) {
            let monitor = CompositeMonitor::default()
                .with(Arc::new(TracingCircuitMonitor::new(&config.subscriber_name)))
                .with(Arc::new(PrometheusCircuitMonitor::new(metrics.clone())));
            let breaker = Arc::new(CircuitBreaker::new(
                config.circuit_breaker_options().with_monitor(Arc::new(monitor)),
            )?);
            builder = builder.with_circuit_breaker(Arc::clone(&breaker));
            Some(breaker)
        } else {
            None
        };

        let rate_limiter = if definition.uses(BehaviourKind::RateLimiter) {
            let limiter = Arc::new(RateLimiter::new(config.rate_limiter_configuration())?);
            builder = builder.with_rate_limiter(Arc::clone(&limiter));
            Some(limiter)
        } else {
            None
        };

        let pipelines = builder.build()?;
        let subscription = topic.subscribe(&config.subscriber_name);
        let subscriber = Subscriber::new(
            config.subscriber_name.as_str(),
            Arc::new(subscription.clone()),
            Arc::new(subscription.clone()),
            &pipelines,
            config.intake.clone(),
        );

        info!(
            subscriber = %config.subscriber_name,
            topic = %topic.name(),
            message_pipeline = ?pipelines.message.behaviour_names(),
            batch_pipeline = ?pipelines.batch.behaviour_names(),
            "Subscriber wired"
        );

        Ok(Self {
            subscriber,
            subscription,
            circuit_breaker,
            rate_limiter,
            metrics,
        })
    }

    /// Listen until `shutdown` turns true, then drain.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> ListenSummary {
        self.subscriber.listen(shutdown).await
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breaker.as_ref()
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for SubscriberHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHost")
            .field("subscriber", &self.subscriber)
            .field("subscription", &self.subscription)
            .field("circuit_breaker", &self.circuit_breaker.is_some())
            .field("rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}
