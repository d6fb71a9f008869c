//! Outbound ports (driven side - SPI)
//!
//! Collaborators the pipeline calls into. The transport supplies the first two;
//! monitoring and statistics sinks are supplied by the host.

use crate::error::{ReceiverError, TransportError};
use async_trait::async_trait;
use shared_types::{LockToken, Message};
use std::time::Duration;

/// Port: settle a received message
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// Acknowledge the delivery, removing the message from the active queue.
    async fn complete(&self, lock_token: LockToken) -> Result<(), ReceiverError>;

    /// Release the lock so the message can be redelivered right away.
    async fn abandon(&self, lock_token: LockToken) -> Result<(), ReceiverError>;

    /// Move the message to dead-letter storage, removing it from the active queue.
    async fn dead_letter(&self, lock_token: LockToken) -> Result<(), ReceiverError>;
}

/// Port: pull batches of messages from the transport
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Receive up to `max_messages`, waiting at most `max_wait` for the first.
    ///
    /// An empty batch means nothing arrived within `max_wait`.
    async fn receive_batch(
        &self,
        max_messages: usize,
        max_wait: Duration,
    ) -> Result<Vec<Message>, TransportError>;
}

/// Port: circuit breaker transition notifications
///
/// Fire-and-forget. Implementations must return quickly; they run on the
/// caller's task right after the transition is committed.
pub trait CircuitMonitor: Send + Sync {
    /// Closed/Testing -> Open.
    fn on_broken(&self);

    /// Testing -> Closed.
    fn on_reset(&self);

    /// Open -> Testing, before the probe is dispatched.
    fn on_testing(&self);
}

/// Outcome of one message pipeline run, as seen by statistics sinks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Handler completed without error
    Succeeded,
    /// Handler or an inner behaviour failed
    Failed,
    /// Rejected by an open circuit
    Rejected,
}

impl ProcessingOutcome {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

/// Port: per-message timing statistics
pub trait StatisticsReporter: Send + Sync {
    /// Record one message pipeline run.
    fn record(&self, message_type: &str, outcome: ProcessingOutcome, elapsed: Duration);
}
