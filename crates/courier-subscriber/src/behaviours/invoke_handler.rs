//! Terminal step of the message scope: dispatch to the registered handler.

use crate::context::MessageContext;
use crate::error::ProcessingError;
use crate::handler::HandlerRegistry;
use crate::pipeline::Terminal;
use async_trait::async_trait;
use std::sync::Arc;

/// Looks up the handler for the message type and awaits it.
///
/// Handler errors propagate unmodified; nothing is caught here.
#[derive(Debug, Clone)]
pub struct InvokeHandler {
    registry: Arc<HandlerRegistry>,
}

impl InvokeHandler {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Terminal<MessageContext> for InvokeHandler {
    async fn run(&self, ctx: &mut MessageContext) -> Result<(), ProcessingError> {
        let handler = self
            .registry
            .resolve(ctx.message_type())
            .ok_or_else(|| ProcessingError::NoHandler {
                message_type: ctx.message_type().to_string(),
            })?;

        handler.handle(ctx.message()).await?;
        Ok(())
    }
}
