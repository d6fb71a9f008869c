//! # In-Memory Topic
//!
//! Fans every published message out to each named subscription. Each
//! subscription keeps its own copy, lock state and dead letters.

use crate::subscriber::{Subscription, SubscriptionOptions};
use parking_lot::RwLock;
use shared_types::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A topic with any number of named subscriptions.
///
/// Cloning shares the same topic.
#[derive(Clone)]
pub struct InMemoryTopic {
    name: Arc<str>,
    options: SubscriptionOptions,
    subscriptions: Arc<RwLock<HashMap<String, Subscription>>>,
}

impl InMemoryTopic {
    /// Create a topic with default lock duration and delivery limit.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_options(name, SubscriptionOptions::default())
    }

    #[must_use]
    pub fn with_options(name: impl Into<Arc<str>>, options: SubscriptionOptions) -> Self {
        Self {
            name: name.into(),
            options,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the named subscription, creating it if needed.
    ///
    /// Only messages sent after creation reach a new subscription.
    pub fn subscribe(&self, subscription: &str) -> Subscription {
        let mut subscriptions = self.subscriptions.write();
        subscriptions
            .entry(subscription.to_string())
            .or_insert_with(|| {
                info!(topic = %self.name, subscription, "Subscription created");
                Subscription::new(&self.name, subscription, self.options)
            })
            .clone()
    }

    pub fn subscription(&self, subscription: &str) -> Option<Subscription> {
        self.subscriptions.read().get(subscription).cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver a copy of `message` to every subscription.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn send(&self, message: Message) -> usize {
        let subscriptions = self.subscriptions.read();
        for subscription in subscriptions.values() {
            subscription.enqueue(message.clone());
        }
        debug!(
            topic = %self.name,
            message_id = %message.id,
            subscriptions = subscriptions.len(),
            "Message sent"
        );
        subscriptions.len()
    }

    /// Close every subscription. Intake stops; locked messages can still be
    /// settled.
    pub fn close(&self) {
        for subscription in self.subscriptions.read().values() {
            subscription.close();
        }
        info!(topic = %self.name, "Topic closed");
    }
}

impl std::fmt::Debug for InMemoryTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTopic")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
