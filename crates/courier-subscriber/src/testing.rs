//! Shared fixtures for unit tests.

use crate::context::MessageContext;
use crate::error::{HandlerError, ProcessingError, ReceiverError};
use crate::pipeline::Terminal;
use crate::ports::MessageReceiver;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{Event, LockToken, Message, MESSAGE_TYPE_PROPERTY};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub seq: u32,
}

impl Event for Ping {
    const MESSAGE_TYPE: &'static str = "Contract.Ping";
}

/// A message as handed out by a transport: typed, locked, first delivery.
pub fn received(message_type: &str) -> Message {
    let mut message =
        Message::new(b"{}".to_vec()).with_user_property(MESSAGE_TYPE_PROPERTY, message_type);
    message.system_properties.lock_token = Some(LockToken::new());
    message.system_properties.delivery_count = 1;
    message
}

#[derive(Default)]
pub struct RecordingReceiver {
    completed: Mutex<Vec<LockToken>>,
    dead_lettered: Mutex<Vec<LockToken>>,
    reject: bool,
}

impl RecordingReceiver {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn completed(&self) -> Vec<LockToken> {
        self.completed.lock().clone()
    }

    pub fn dead_lettered(&self) -> Vec<LockToken> {
        self.dead_lettered.lock().clone()
    }
}

#[async_trait]
impl MessageReceiver for RecordingReceiver {
    async fn complete(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        if self.reject {
            return Err(ReceiverError::LockLost(lock_token));
        }
        self.completed.lock().push(lock_token);
        Ok(())
    }

    async fn abandon(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        if self.reject {
            return Err(ReceiverError::LockLost(lock_token));
        }
        Ok(())
    }

    async fn dead_letter(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        if self.reject {
            return Err(ReceiverError::LockLost(lock_token));
        }
        self.dead_lettered.lock().push(lock_token);
        Ok(())
    }
}

/// Terminal that optionally sleeps, then succeeds or fails with a fixed error.
pub struct FailingTerminal {
    failure: Option<(String, String)>,
    delay: Option<Duration>,
    runs: AtomicUsize,
}

impl FailingTerminal {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            delay: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: HandlerError) -> Self {
        Self {
            failure: Some((error.kind().to_string(), error.message().to_string())),
            delay: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Terminal<MessageContext> for FailingTerminal {
    async fn run(&self, _ctx: &mut MessageContext) -> Result<(), ProcessingError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some((kind, message)) => Err(HandlerError::new(kind.clone(), message.clone()).into()),
            None => Ok(()),
        }
    }
}
