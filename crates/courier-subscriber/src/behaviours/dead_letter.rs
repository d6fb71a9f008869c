//! Dead-lettering of permanently failing messages.
//!
//! Two placements:
//!
//! - [`NonTransientFailureBehaviour`] is a disposing behaviour. It replaces
//!   `default` as the outermost wrapper, dead-letters permanent failures and
//!   hands every other outcome to its [`DefaultBehaviour`].
//! - [`PoisonMessageBehaviour`] sits anywhere inside the chain. It dead-letters
//!   permanent failures and re-raises everything else unchanged.

use super::default::DefaultBehaviour;
use crate::context::{Disposition, MessageContext};
use crate::domain::{FailureClassifier, FailureKind};
use crate::error::{ProcessingError, ReceiverError};
use crate::pipeline::{Behaviour, Next};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Move the message to dead-letter storage and mark it settled.
async fn dead_letter(ctx: &mut MessageContext, error: &ProcessingError) -> Result<(), ReceiverError> {
    let lock_token = ctx
        .message()
        .lock_token()
        .ok_or(ReceiverError::MissingLockToken)?;
    ctx.receiver().dead_letter(lock_token).await?;
    ctx.set_disposition(Disposition::DeadLettered);

    warn!(
        subscriber = ctx.subscriber_name(),
        message_type = ctx.message_type(),
        correlation_id = ctx.correlation_id(),
        error_kind = error.kind(),
        error = %error,
        "message deadlettered. `{}` correlation id `{}` on subscriber `{}`",
        ctx.message_type(),
        ctx.correlation_id(),
        ctx.subscriber_name(),
    );
    Ok(())
}

fn log_dead_letter_failure(ctx: &MessageContext, error: &ReceiverError) {
    warn!(
        subscriber = ctx.subscriber_name(),
        message_type = ctx.message_type(),
        correlation_id = ctx.correlation_id(),
        error = %error,
        "Failed to dead-letter message"
    );
}

/// Disposing behaviour that dead-letters permanent failures.
#[derive(Debug, Clone)]
pub struct NonTransientFailureBehaviour {
    classifier: Arc<FailureClassifier>,
    fallback: DefaultBehaviour,
}

impl NonTransientFailureBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "non_transient_failure";

    /// Dead-letter what `classifier` calls permanent.
    pub fn new(classifier: Arc<FailureClassifier>) -> Self {
        Self {
            classifier,
            fallback: DefaultBehaviour,
        }
    }
}

#[async_trait]
impl Behaviour<MessageContext> for NonTransientFailureBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        next: Next<'_, MessageContext>,
    ) -> Result<(), ProcessingError> {
        let error = match next.run(ctx).await {
            Ok(()) => {
                self.fallback.on_success(ctx).await;
                return Ok(());
            }
            Err(e) => e,
        };

        if self.classifier.classify(&error) == FailureKind::Permanent {
            if let Err(e) = dead_letter(ctx, &error).await {
                log_dead_letter_failure(ctx, &e);
                self.fallback.on_failure(ctx, &error);
            }
        } else {
            self.fallback.on_failure(ctx, &error);
        }
        Ok(())
    }
}

/// Inner behaviour that dead-letters permanent failures.
#[derive(Debug, Clone)]
pub struct PoisonMessageBehaviour {
    classifier: Arc<FailureClassifier>,
}

impl PoisonMessageBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "poison_message";

    /// Dead-letter what `classifier` calls permanent.
    pub fn new(classifier: Arc<FailureClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Behaviour<MessageContext> for PoisonMessageBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        next: Next<'_, MessageContext>,
    ) -> Result<(), ProcessingError> {
        match next.run(ctx).await {
            Err(error) if self.classifier.classify(&error) == FailureKind::Permanent => {
                match dead_letter(ctx, &error).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        log_dead_letter_failure(ctx, &e);
                        Err(error)
                    }
                }
            }
            other => other,
        }
    }
}
