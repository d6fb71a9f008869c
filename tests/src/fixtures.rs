//! Shared fixtures for the scenario tests.

use async_trait::async_trait;
use courier_subscriber::{
    CircuitMonitor, EventHandler, HandlerError, HandlerRegistry, IntakeConfig, MessageContext,
    MessageReceiver, PipelineBuilder, Pipelines, Subscriber,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::Subscription;
use shared_types::{Event, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const SUBSCRIBER: &str = "ScenarioSubscriber";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
}

impl Event for Job {
    const MESSAGE_TYPE: &'static str = "Contract.Job";
}

/// Handler whose result can be switched while a test runs.
///
/// `fail_with` applies to every job; `fail_ids` to listed ids only.
#[derive(Default)]
pub struct ScriptedHandler {
    fail_with: Mutex<Option<&'static str>>,
    fail_ids: Mutex<Vec<(u64, &'static str)>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    /// Fail every job with `kind`, or succeed when `None`.
    pub fn fail_with(&self, kind: Option<&'static str>) {
        *self.fail_with.lock() = kind;
    }

    pub fn fail_job(&self, id: u64, kind: &'static str) {
        self.fail_ids.lock().push((id, kind));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// When each call started, in call order.
    pub fn started(&self) -> Vec<Instant> {
        self.started.lock().clone()
    }

    pub fn registry(self: &Arc<Self>) -> Arc<HandlerRegistry> {
        match HandlerRegistry::builder()
            .register_shared(Arc::clone(self))
            .build()
        {
            Ok(registry) => Arc::new(registry),
            Err(e) => panic!("registry: {e}"),
        }
    }
}

#[async_trait]
impl EventHandler for ScriptedHandler {
    type Event = Job;

    async fn handle(&self, job: Job, _message: &Message) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().push(Instant::now());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let per_job = self
            .fail_ids
            .lock()
            .iter()
            .find(|(id, _)| *id == job.id)
            .map(|(_, kind)| *kind);
        match per_job.or(*self.fail_with.lock()) {
            Some(kind) => Err(HandlerError::new(kind, format!("job {} failed", job.id))),
            None => Ok(()),
        }
    }
}

/// Counts circuit transitions.
#[derive(Default)]
pub struct CountingMonitor {
    pub broken: AtomicUsize,
    pub testing: AtomicUsize,
    pub reset: AtomicUsize,
}

impl CountingMonitor {
    /// `(broken, testing, reset)`
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.broken.load(Ordering::SeqCst),
            self.testing.load(Ordering::SeqCst),
            self.reset.load(Ordering::SeqCst),
        )
    }
}

impl CircuitMonitor for CountingMonitor {
    fn on_broken(&self) {
        self.broken.fetch_add(1, Ordering::SeqCst);
    }

    fn on_reset(&self) {
        self.reset.fetch_add(1, Ordering::SeqCst);
    }

    fn on_testing(&self) {
        self.testing.fetch_add(1, Ordering::SeqCst);
    }
}

/// Context for a message handed out by `subscription`.
pub fn message_context(message: Message, subscription: &Subscription) -> MessageContext {
    let receiver: Arc<dyn MessageReceiver> = Arc::new(subscription.clone());
    MessageContext::new(message, receiver, Arc::from(SUBSCRIBER))
}

/// Subscriber reading from and settling on `subscription`.
pub fn subscriber(
    subscription: &Subscription,
    pipelines: &Pipelines,
    intake: IntakeConfig,
) -> Subscriber {
    Subscriber::new(
        SUBSCRIBER,
        Arc::new(subscription.clone()),
        Arc::new(subscription.clone()),
        pipelines,
        intake,
    )
}

/// Small batches, short receive wait.
pub fn quick_intake() -> IntakeConfig {
    IntakeConfig {
        batch_size: 8,
        receive_wait_ms: 50,
        max_concurrent_batches: 2,
    }
}

pub fn build(builder: PipelineBuilder) -> Pipelines {
    match builder.build() {
        Ok(pipelines) => pipelines,
        Err(e) => panic!("pipelines: {e}"),
    }
}

/// Poll `condition` every 10ms until it holds or `limit` elapses.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
