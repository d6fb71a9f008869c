//! # Subscription Queue
//!
//! Peek-lock delivery for one named subscription on a topic.
//!
//! ```text
//! publish ──► ready ──receive_batch──► locked ──complete──► (gone)
//!               ▲                         │
//!               └──── abandon / expiry ───┤
//!                                         └──dead_letter──► dead letters
//! ```
//!
//! A message whose delivery count already reached `max_delivery_count` is
//! moved to dead-letter storage instead of being delivered again.

use async_trait::async_trait;
use courier_subscriber::{MessageReceiver, MessageSource, ReceiverError, TransportError};
use parking_lot::Mutex;
use shared_types::{LockToken, Message};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Delivery settings shared by every subscription on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// How long a received message stays invisible to other receivers.
    pub lock_duration: Duration,
    /// Deliveries allowed before the message is dead-lettered.
    pub max_delivery_count: u32,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            lock_duration: crate::DEFAULT_LOCK_DURATION,
            max_delivery_count: crate::DEFAULT_MAX_DELIVERY_COUNT,
        }
    }
}

/// Why a message ended up in dead-letter storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    /// A receiver asked for it.
    Requested,
    /// Delivered `max_delivery_count` times without being completed.
    MaxDeliveryCountExceeded,
}

/// A dead-lettered message with its original properties intact.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: Message,
    pub reason: DeadLetterReason,
    pub dead_lettered_at: SystemTime,
}

struct Locked {
    message: Message,
    until: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Message>,
    locked: HashMap<LockToken, Locked>,
    dead_letters: Vec<DeadLetter>,
    closed: bool,
}

impl QueueState {
    /// Return messages with expired locks to the front of the queue.
    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<LockToken> = self
            .locked
            .iter()
            .filter(|(_, locked)| locked.until <= now)
            .map(|(token, _)| *token)
            .collect();
        for token in expired {
            if let Some(locked) = self.locked.remove(&token) {
                debug!(message_id = %locked.message.id, "Lock expired, message returned to queue");
                self.ready.push_front(unlocked(locked.message));
            }
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.locked.values().map(|locked| locked.until).min()
    }
}

fn unlocked(mut message: Message) -> Message {
    message.system_properties.lock_token = None;
    message
}

struct SubscriptionInner {
    topic: String,
    name: String,
    options: SubscriptionOptions,
    state: Mutex<QueueState>,
    arrivals: Notify,
}

/// Handle to one subscription's queue.
///
/// Cheap to clone; every clone sees the same queue. Acts as both the
/// [`MessageSource`] and the [`MessageReceiver`] for the subscriber pipeline.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn new(topic: &str, name: &str, options: SubscriptionOptions) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                topic: topic.to_string(),
                name: name.to_string(),
                options,
                state: Mutex::new(QueueState::default()),
                arrivals: Notify::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn options(&self) -> SubscriptionOptions {
        self.inner.options
    }

    /// Messages waiting for delivery, not counting locked ones.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().ready.len()
    }

    /// Messages currently held under a lock.
    pub fn locked_count(&self) -> usize {
        self.inner.state.lock().locked.len()
    }

    /// Snapshot of dead-letter storage, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.state.lock().dead_letters.clone()
    }

    pub(crate) fn enqueue(&self, message: Message) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                debug!(subscription = %self.inner.name, "Subscription closed, message dropped");
                return;
            }
            state.ready.push_back(unlocked(message));
        }
        self.inner.arrivals.notify_waiters();
    }

    /// Stop handing out messages, including ones already queued. Locked
    /// messages can still be settled.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.arrivals.notify_waiters();
    }

    /// Lock up to `max_messages` ready messages.
    ///
    /// Runs entirely under the state lock, so a caller that is cancelled
    /// afterwards never loses a message it did not see.
    fn take_batch(&self, max_messages: usize, now: Instant) -> Result<Vec<Message>, TransportError> {
        let options = self.inner.options;
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.release_expired(now);

        let mut batch = Vec::new();
        while batch.len() < max_messages {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            if message.system_properties.delivery_count >= options.max_delivery_count {
                warn!(
                    subscription = %self.inner.name,
                    message_id = %message.id,
                    delivery_count = message.system_properties.delivery_count,
                    "Max delivery count exceeded, message dead-lettered"
                );
                state.dead_letters.push(DeadLetter {
                    message,
                    reason: DeadLetterReason::MaxDeliveryCountExceeded,
                    dead_lettered_at: SystemTime::now(),
                });
                continue;
            }

            let token = LockToken::new();
            message.system_properties.delivery_count += 1;
            message.system_properties.lock_token = Some(token);
            state.locked.insert(
                token,
                Locked {
                    message: message.clone(),
                    until: now + options.lock_duration,
                },
            );
            batch.push(message);
        }
        Ok(batch)
    }

    /// Remove a live lock, or report it lost.
    ///
    /// An expired lock is lost even if the sweep has not run yet; the
    /// message goes back to the queue.
    fn settle(&self, token: LockToken) -> Result<Message, ReceiverError> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        let Some(locked) = state.locked.remove(&token) else {
            return Err(ReceiverError::LockLost(token));
        };
        if locked.until <= now {
            state.ready.push_front(unlocked(locked.message));
            drop(state);
            self.inner.arrivals.notify_waiters();
            return Err(ReceiverError::LockLost(token));
        }
        Ok(locked.message)
    }
}

#[async_trait]
impl MessageSource for Subscription {
    async fn receive_batch(
        &self,
        max_messages: usize,
        max_wait: Duration,
    ) -> Result<Vec<Message>, TransportError> {
        let deadline = Instant::now() + max_wait;
        loop {
            let arrived = self.inner.arrivals.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            let now = Instant::now();
            let batch = self.take_batch(max_messages.max(1), now)?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let wake = {
                let state = self.inner.state.lock();
                state.next_expiry().map_or(deadline, |expiry| expiry.min(deadline))
            };
            if now >= deadline {
                return Ok(Vec::new());
            }

            tokio::select! {
                _ = &mut arrived => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

#[async_trait]
impl MessageReceiver for Subscription {
    async fn complete(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        let message = self.settle(lock_token)?;
        debug!(subscription = %self.inner.name, message_id = %message.id, "Message completed");
        Ok(())
    }

    async fn abandon(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        let message = self.settle(lock_token)?;
        debug!(subscription = %self.inner.name, message_id = %message.id, "Message abandoned");
        self.inner.state.lock().ready.push_front(unlocked(message));
        self.inner.arrivals.notify_waiters();
        Ok(())
    }

    async fn dead_letter(&self, lock_token: LockToken) -> Result<(), ReceiverError> {
        let message = self.settle(lock_token)?;
        debug!(subscription = %self.inner.name, message_id = %message.id, "Message dead-lettered");
        self.inner.state.lock().dead_letters.push(DeadLetter {
            message: unlocked(message),
            reason: DeadLetterReason::Requested,
            dead_lettered_at: SystemTime::now(),
        });
        Ok(())
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Subscription")
            .field("topic", &self.inner.topic)
            .field("name", &self.inner.name)
            .field("ready", &state.ready.len())
            .field("locked", &state.locked.len())
            .field("dead_letters", &state.dead_letters.len())
            .finish()
    }
}
