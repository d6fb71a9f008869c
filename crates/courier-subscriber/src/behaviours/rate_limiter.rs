//! Rate limiter behaviour, usable in either scope.

use crate::domain::RateLimiter;
use crate::error::ProcessingError;
use crate::pipeline::{Behaviour, Next};
use async_trait::async_trait;
use std::sync::Arc;

/// Takes one permit from a shared [`RateLimiter`] per invocation.
///
/// In the batch scope that is one permit per batch intake, in the message
/// scope one per message. Waiting is backpressure, never an error.
#[derive(Debug, Clone)]
pub struct RateLimiterBehaviour {
    limiter: Arc<RateLimiter>,
}

impl RateLimiterBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "rate_limiter";

    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl<C: Send> Behaviour<C> for RateLimiterBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(&self, ctx: &mut C, next: Next<'_, C>) -> Result<(), ProcessingError> {
        self.limiter.acquire().await;
        next.run(ctx).await
    }
}
