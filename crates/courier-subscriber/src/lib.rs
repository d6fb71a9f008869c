//! # Courier - Subscriber Pipeline
//!
//! Every inbound batch and every inbound message passes through an ordered
//! chain of cross-cutting behaviours before it reaches handler code.
//!
//! ## Purpose
//!
//! - Acknowledge handled messages, leave failed ones for redelivery
//! - Dead-letter messages whose failures can never succeed on retry
//! - Stop calling a failing dependency for a cooldown period (circuit breaker)
//! - Cap throughput to a configured ceiling (rate limiter)
//! - Route each message to the handler registered for its type
//!
//! ## Control Flow
//!
//! ```text
//! Subscriber::listen
//!   └─► receive_batch ──► batch pipeline
//!                           default ─► [circuit_breaker] ─► [rate_limiter] ─► BatchDispatch
//!                                                                                │ per message,
//!                                                                                ▼ concurrently
//!                         message pipeline
//!                           default | non_transient_failure ─► ... ─► InvokeHandler ─► handler
//! ```
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Service: Subscriber intake loop, graceful drain    │
//! ├─────────────────────────────────────────────────────┤
//! │  Pipeline: Behaviour / Terminal / Next, builder     │
//! │  Behaviours: default, dead-letter, breaker, limiter │
//! ├─────────────────────────────────────────────────────┤
//! │  Domain: CircuitBreaker, RateLimiter, classifier    │
//! ├─────────────────────────────────────────────────────┤
//! │  Ports: MessageSource, MessageReceiver,             │
//! │         CircuitMonitor, StatisticsReporter          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! 1. Behaviours run in declared order; the terminal runs at most once
//! 2. The outermost message behaviour always settles the message
//! 3. At most one probe call while the circuit is testing
//! 4. No rolling second admits more than the configured rate
//! 5. Shutdown stops intake and drains in-flight messages

#![warn(clippy::all)]

pub mod adapters;
pub mod behaviours;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod ports;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use adapters::{CompositeMonitor, TracingCircuitMonitor};
pub use config::{IntakeConfig, SubscriberConfig};
pub use context::{BatchContext, Disposition, MessageContext};
pub use domain::{
    CircuitBreaker, CircuitBreakerOptions, CircuitState, FailureClassifier, FailureKind,
    RateLimiter, RateLimiterConfiguration,
};
pub use error::{
    ConfigError, HandlerError, ProcessingError, ReceiverError, Result, TransportError,
    MALFORMED_PAYLOAD,
};
pub use handler::{EventHandler, HandlerRegistry, MessageHandler};
pub use pipeline::{
    Behaviour, BehaviourKind, Next, Pipeline, PipelineBuilder, PipelineDefinition, Pipelines,
    Terminal,
};
pub use ports::{
    CircuitMonitor, MessageReceiver, MessageSource, ProcessingOutcome, StatisticsReporter,
};
pub use service::{ListenSummary, Subscriber};
