//! Per-message timing statistics.

use crate::context::MessageContext;
use crate::error::ProcessingError;
use crate::pipeline::{Behaviour, Next};
use crate::ports::{ProcessingOutcome, StatisticsReporter};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

/// Times the rest of the chain and reports the outcome.
///
/// Passes the result through unchanged.
#[derive(Clone)]
pub struct MonitoringBehaviour {
    reporter: Arc<dyn StatisticsReporter>,
}

impl MonitoringBehaviour {
    /// Name in pipeline configuration.
    pub const NAME: &'static str = "monitoring";

    pub fn new(reporter: Arc<dyn StatisticsReporter>) -> Self {
        Self { reporter }
    }
}

impl std::fmt::Debug for MonitoringBehaviour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringBehaviour").finish_non_exhaustive()
    }
}

#[async_trait]
impl Behaviour<MessageContext> for MonitoringBehaviour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        next: Next<'_, MessageContext>,
    ) -> Result<(), ProcessingError> {
        let started = Instant::now();
        let result = next.run(ctx).await;

        let outcome = match &result {
            Ok(()) => ProcessingOutcome::Succeeded,
            Err(e) if e.is_circuit_open() => ProcessingOutcome::Rejected,
            Err(_) => ProcessingOutcome::Failed,
        };
        self.reporter
            .record(ctx.message_type(), outcome, started.elapsed());
        result
    }
}
