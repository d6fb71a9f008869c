//! Subscriber intake loop.
//!
//! ```text
//! listen ──► wait for batch slot ──► receive_batch ──► spawn batch pipeline
//!    ▲                                                        │
//!    └────────────────────────── loop ◄───────────────────────┘
//!
//! shutdown ──► stop intake ──► await every in-flight batch ──► ListenSummary
//! ```
//!
//! In-flight batches are never aborted. Each message reaches a disposition
//! (completed, dead-lettered or left for redelivery) before `listen` returns.

use crate::config::IntakeConfig;
use crate::context::{BatchContext, Disposition};
use crate::error::TransportError;
use crate::pipeline::{Pipeline, Pipelines};
use crate::ports::{MessageReceiver, MessageSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// What a [`Subscriber::listen`] run processed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenSummary {
    /// Batches received
    pub batches: u64,
    /// Messages received
    pub messages: u64,
    /// Messages acknowledged
    pub completed: u64,
    /// Messages moved to dead-letter storage
    pub dead_lettered: u64,
    /// Messages left for the transport to redeliver
    pub left_for_redelivery: u64,
}

impl ListenSummary {
    fn absorb(&mut self, dispositions: &[Disposition]) {
        for disposition in dispositions {
            match disposition {
                Disposition::Completed => self.completed += 1,
                Disposition::DeadLettered => self.dead_lettered += 1,
                Disposition::LeftForRedelivery => self.left_for_redelivery += 1,
            }
        }
    }
}

/// Pulls batches from a [`MessageSource`] and runs them through the batch
/// pipeline.
pub struct Subscriber {
    name: Arc<str>,
    source: Arc<dyn MessageSource>,
    receiver: Arc<dyn MessageReceiver>,
    batch_pipeline: Arc<Pipeline<BatchContext>>,
    intake: IntakeConfig,
    retry_pause: Duration,
}

impl Subscriber {
    pub fn new(
        name: impl Into<Arc<str>>,
        source: Arc<dyn MessageSource>,
        receiver: Arc<dyn MessageReceiver>,
        pipelines: &Pipelines,
        intake: IntakeConfig,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            receiver,
            batch_pipeline: Arc::clone(&pipelines.batch),
            intake,
            retry_pause: Duration::from_secs(1),
        }
    }

    /// Pause after a failed receive before trying again (default: 1s).
    #[must_use]
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive and process batches until `shutdown` turns true (or its sender
    /// is dropped), then drain in-flight batches.
    pub async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> ListenSummary {
        let slots = Arc::new(Semaphore::new(self.intake.max_concurrent_batches.max(1)));
        let mut in_flight: JoinSet<Vec<Disposition>> = JoinSet::new();
        let mut summary = ListenSummary::default();

        info!(
            subscriber = %self.name,
            batch_size = self.intake.batch_size,
            max_concurrent_batches = self.intake.max_concurrent_batches,
            "Subscriber listening"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let slot = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.finish_batch(joined, &mut summary);
                    continue;
                }
                slot = Arc::clone(&slots).acquire_owned() => match slot {
                    Ok(slot) => slot,
                    Err(_) => break,
                },
            };

            let received = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                received = self
                    .source
                    .receive_batch(self.intake.batch_size, self.intake.receive_wait()) => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => continue,
                Ok(messages) => {
                    summary.batches += 1;
                    summary.messages += messages.len() as u64;
                    debug!(subscriber = %self.name, messages = messages.len(), "Batch received");

                    let pipeline = Arc::clone(&self.batch_pipeline);
                    let mut ctx =
                        BatchContext::new(messages, Arc::clone(&self.receiver), Arc::clone(&self.name));
                    in_flight.spawn(async move {
                        let _slot = slot;
                        let result = pipeline.invoke(&mut ctx).await;
                        // Behaviours declared outside the batch default can still reject.
                        ctx.leave_undispatched();
                        match result {
                            Ok(()) => {}
                            Err(e) if e.is_circuit_open() => debug!(
                                subscriber = ctx.subscriber_name(),
                                "Circuit open, batch left for redelivery"
                            ),
                            Err(e) => warn!(error = %e, "Batch pipeline returned an unhandled error"),
                        }
                        ctx.dispositions().to_vec()
                    });
                }
                Err(TransportError::Closed) => {
                    info!(subscriber = %self.name, "Message source closed");
                    break;
                }
                Err(e) => {
                    warn!(
                        subscriber = %self.name,
                        error = %e,
                        retry_in_ms = self.retry_pause.as_millis() as u64,
                        "Receive failed"
                    );
                    tokio::select! {
                        biased;
                        _ = stopped(&mut shutdown) => break,
                        _ = tokio::time::sleep(self.retry_pause) => {}
                    }
                }
            }
        }

        info!(
            subscriber = %self.name,
            in_flight = in_flight.len(),
            "Intake stopped, draining in-flight batches"
        );
        while let Some(joined) = in_flight.join_next().await {
            self.finish_batch(joined, &mut summary);
        }

        info!(
            subscriber = %self.name,
            batches = summary.batches,
            messages = summary.messages,
            completed = summary.completed,
            dead_lettered = summary.dead_lettered,
            left_for_redelivery = summary.left_for_redelivery,
            "Subscriber stopped"
        );
        summary
    }

    fn finish_batch(&self, joined: Result<Vec<Disposition>, JoinError>, summary: &mut ListenSummary) {
        match joined {
            Ok(dispositions) => summary.absorb(&dispositions),
            Err(e) => error!(subscriber = %self.name, error = %e, "Batch task panicked"),
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("intake", &self.intake)
            .finish_non_exhaustive()
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
