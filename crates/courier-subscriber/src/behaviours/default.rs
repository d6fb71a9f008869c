//! Default behaviours: the outermost safety net of each scope.
//!
//! Message scope: acknowledge on success, log and leave for redelivery on
//! failure. Batch scope: log failures of the batch as a whole; messages that
//! were never dispatched stay unsettled and are redelivered by the transport.

use crate::context::{BatchContext, Disposition, MessageContext};
use crate::error::ProcessingError;
use crate::pipeline::{Behaviour, Next};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Acknowledge-or-leave behaviour for the message scope.
///
/// More specific failure-routing behaviours hold one of these and hand it
/// every outcome they do not handle themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBehaviour;

impl DefaultBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "default";

    /// Acknowledge a successfully handled message.
    ///
    /// A message already settled by an inner behaviour is left alone.
    pub async fn on_success(&self, ctx: &mut MessageContext) {
        if ctx.disposition().is_some() {
            return;
        }

        let Some(lock_token) = ctx.message().lock_token() else {
            warn!(
                subscriber = ctx.subscriber_name(),
                message_type = ctx.message_type(),
                correlation_id = ctx.correlation_id(),
                "Handled message has no lock token, cannot complete"
            );
            ctx.set_disposition(Disposition::LeftForRedelivery);
            return;
        };

        match ctx.receiver().complete(lock_token).await {
            Ok(()) => {
                debug!(
                    subscriber = ctx.subscriber_name(),
                    message_type = ctx.message_type(),
                    correlation_id = ctx.correlation_id(),
                    "Message completed"
                );
                ctx.set_disposition(Disposition::Completed);
            }
            Err(e) => {
                warn!(
                    subscriber = ctx.subscriber_name(),
                    message_type = ctx.message_type(),
                    correlation_id = ctx.correlation_id(),
                    lock_token = %lock_token,
                    error = %e,
                    "Failed to complete message, leaving it for redelivery"
                );
                ctx.set_disposition(Disposition::LeftForRedelivery);
            }
        }
    }

    /// Treat a failure as unclassified: log it and leave the message
    /// unacknowledged so the transport's redelivery policy applies.
    pub fn on_failure(&self, ctx: &mut MessageContext, error: &ProcessingError) {
        if ctx.disposition().is_some() {
            return;
        }

        if error.is_circuit_open() {
            debug!(
                subscriber = ctx.subscriber_name(),
                message_type = ctx.message_type(),
                correlation_id = ctx.correlation_id(),
                "Circuit open, message left for redelivery"
            );
        } else {
            warn!(
                subscriber = ctx.subscriber_name(),
                error_kind = error.kind(),
                message_type = ctx.message_type(),
                correlation_id = ctx.correlation_id(),
                delivery_count = ctx.message().delivery_count(),
                error = %error,
                "Message processing failed, leaving it for redelivery"
            );
        }
        ctx.set_disposition(Disposition::LeftForRedelivery);
    }
}

#[async_trait]
impl Behaviour<MessageContext> for DefaultBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        next: Next<'_, MessageContext>,
    ) -> Result<(), ProcessingError> {
        match next.run(ctx).await {
            Ok(()) => self.on_success(ctx).await,
            Err(e) => self.on_failure(ctx, &e),
        }
        Ok(())
    }
}

/// Outermost behaviour of the batch scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBatchBehaviour;

#[async_trait]
impl Behaviour<BatchContext> for DefaultBatchBehaviour {
    fn name(&self) -> &'static str {
        DefaultBehaviour::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut BatchContext,
        next: Next<'_, BatchContext>,
    ) -> Result<(), ProcessingError> {
        let received = ctx.len();
        let result = next.run(ctx).await;

        // Messages the batch never reached stay with the transport.
        ctx.leave_undispatched();

        match result {
            Ok(()) => debug!(
                subscriber = ctx.subscriber_name(),
                messages = received,
                "Batch processed"
            ),
            Err(e) if e.is_circuit_open() => debug!(
                subscriber = ctx.subscriber_name(),
                messages = received,
                "Circuit open, batch left for redelivery"
            ),
            Err(e) => warn!(
                subscriber = ctx.subscriber_name(),
                messages = received,
                error_kind = e.kind(),
                error = %e,
                "Batch processing failed"
            ),
        }
        Ok(())
    }
}
