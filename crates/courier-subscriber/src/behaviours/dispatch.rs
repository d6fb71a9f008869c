//! Terminal step of the batch scope: run every message through the message
//! pipeline concurrently and wait for all of them.

use crate::context::{BatchContext, Disposition, MessageContext};
use crate::error::ProcessingError;
use crate::pipeline::{Pipeline, Terminal};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, warn};

/// Fans a batch out to the message pipeline.
#[derive(Debug)]
pub struct BatchDispatch {
    pipeline: Arc<Pipeline<MessageContext>>,
}

impl BatchDispatch {
    pub fn new(pipeline: Arc<Pipeline<MessageContext>>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Terminal<BatchContext> for BatchDispatch {
    async fn run(&self, ctx: &mut BatchContext) -> Result<(), ProcessingError> {
        let mut tasks = JoinSet::new();
        for mut message_ctx in ctx.take_message_contexts() {
            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let result = pipeline.invoke(&mut message_ctx).await;
                (message_ctx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((message_ctx, result)) => {
                    if let Err(e) = result {
                        // Only reachable when no disposing behaviour caught it.
                        warn!(
                            subscriber = message_ctx.subscriber_name(),
                            message_type = message_ctx.message_type(),
                            correlation_id = message_ctx.correlation_id(),
                            error = %e,
                            "Message pipeline returned an unhandled error"
                        );
                    }
                    ctx.push_disposition(
                        message_ctx
                            .disposition()
                            .unwrap_or(Disposition::LeftForRedelivery),
                    );
                }
                Err(e) => {
                    error!(
                        subscriber = ctx.subscriber_name(),
                        error = %e,
                        "Message pipeline task panicked"
                    );
                    ctx.push_disposition(Disposition::LeftForRedelivery);
                }
            }
        }
        Ok(())
    }
}
