//! Circuit breaker behaviour, usable in either scope.
//!
//! Only the message scope takes permits and records outcomes. The batch
//! scope gates intake on the same breaker: it rejects whole batches while
//! the circuit is open and lets a batch through once a probe is due, so the
//! probe is always decided by a message that reached the handler.

use crate::context::{BatchContext, MessageContext};
use crate::domain::CircuitBreaker;
use crate::error::ProcessingError;
use crate::pipeline::{Behaviour, Next};
use async_trait::async_trait;
use std::sync::Arc;

/// Gates the rest of the chain on a shared [`CircuitBreaker`].
///
/// While open, fails immediately with [`ProcessingError::CircuitOpen`]
/// without running the rest of the chain.
#[derive(Debug, Clone)]
pub struct CircuitBreakerBehaviour {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "circuit_breaker";

    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }
}

#[async_trait]
impl Behaviour<MessageContext> for CircuitBreakerBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        next: Next<'_, MessageContext>,
    ) -> Result<(), ProcessingError> {
        let permit = self.breaker.acquire()?;
        let result = next.run(ctx).await;
        self.breaker.record(permit, &result);
        result
    }
}

#[async_trait]
impl Behaviour<BatchContext> for CircuitBreakerBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut BatchContext,
        next: Next<'_, BatchContext>,
    ) -> Result<(), ProcessingError> {
        self.breaker.gate()?;
        next.run(ctx).await
    }
}
