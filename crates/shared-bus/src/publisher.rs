//! # Event Publisher
//!
//! Encodes events, stamps the `MessageType` and correlation id properties,
//! and sends them to a topic.

use crate::topic::InMemoryTopic;
use async_trait::async_trait;
use shared_types::{Event, Message, MessageError, CORRELATION_ID_PROPERTY};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Encode(#[from] MessageError),
}

/// Supplies the correlation id stamped on each outgoing message.
pub trait CorrelationIdProvider: Send + Sync {
    /// `None` leaves the property unset.
    fn correlation_id(&self) -> Option<String>;
}

/// A fresh v4 UUID per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCorrelationId;

impl CorrelationIdProvider for RandomCorrelationId {
    fn correlation_id(&self) -> Option<String> {
        Some(Uuid::new_v4().to_string())
    }
}

/// The same id on every message, or none at all.
#[derive(Debug, Default, Clone)]
pub struct FixedCorrelationId(pub Option<String>);

impl CorrelationIdProvider for FixedCorrelationId {
    fn correlation_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a prepared message.
    ///
    /// # Returns
    ///
    /// The number of subscriptions that received it.
    async fn publish_message(&self, message: Message) -> usize;

    /// Get the total number of messages published.
    fn events_published(&self) -> u64;
}

/// Publishes onto an [`InMemoryTopic`].
pub struct TopicPublisher {
    topic: InMemoryTopic,
    correlation_ids: Arc<dyn CorrelationIdProvider>,
    events_published: AtomicU64,
}

impl TopicPublisher {
    /// Publisher stamping a random correlation id on every message.
    #[must_use]
    pub fn new(topic: InMemoryTopic) -> Self {
        Self {
            topic,
            correlation_ids: Arc::new(RandomCorrelationId),
            events_published: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_correlation_ids(mut self, provider: Arc<dyn CorrelationIdProvider>) -> Self {
        self.correlation_ids = provider;
        self
    }

    pub fn topic(&self) -> &InMemoryTopic {
        &self.topic
    }

    /// Encode and publish an event.
    pub async fn publish<E: Event>(&self, event: &E) -> Result<usize, PublishError> {
        let message = Message::from_event(event)?;
        Ok(self.publish_message(message).await)
    }
}

#[async_trait]
impl EventPublisher for TopicPublisher {
    async fn publish_message(&self, mut message: Message) -> usize {
        if message.correlation_id().is_none() {
            if let Some(id) = self.correlation_ids.correlation_id() {
                message.user_properties.insert(CORRELATION_ID_PROPERTY.to_string(), id);
            }
        }

        debug!(
            topic = %self.topic.name(),
            message_type = message.message_type_or_unknown(),
            correlation_id = message.correlation_id_or_null(),
            "Publishing message"
        );

        let receivers = self.topic.send(message);
        self.events_published.fetch_add(1, Ordering::Relaxed);
        if receivers == 0 {
            warn!(topic = %self.topic.name(), "Message published with no subscriptions");
        }
        receivers
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TopicPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicPublisher")
            .field("topic", &self.topic.name())
            .field("events_published", &self.events_published())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_subscriber::MessageSource;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        order: u64,
    }

    impl Event for OrderPlaced {
        const MESSAGE_TYPE: &'static str = "Contract.OrderPlaced";
    }

    #[tokio::test]
    async fn test_publish_stamps_type_and_correlation_id() {
        let topic = InMemoryTopic::new("orders");
        let sub = topic.subscribe("billing");
        let publisher = TopicPublisher::new(topic);

        assert_eq!(publisher.publish(&OrderPlaced { order: 7 }).await.unwrap(), 1);
        assert_eq!(publisher.events_published(), 1);

        let batch = sub.receive_batch(1, Duration::ZERO).await.unwrap();
        assert_eq!(batch[0].message_type(), Some("Contract.OrderPlaced"));
        let id = batch[0].correlation_id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(batch[0].decode::<OrderPlaced>().unwrap(), OrderPlaced { order: 7 });
    }

    #[tokio::test]
    async fn test_fixed_and_missing_correlation_ids() {
        let topic = InMemoryTopic::new("orders");
        let sub = topic.subscribe("billing");

        let fixed = TopicPublisher::new(topic.clone())
            .with_correlation_ids(Arc::new(FixedCorrelationId(Some("abc".into()))));
        fixed.publish(&OrderPlaced { order: 1 }).await.unwrap();

        let none = TopicPublisher::new(topic).with_correlation_ids(Arc::new(FixedCorrelationId(None)));
        none.publish(&OrderPlaced { order: 2 }).await.unwrap();

        let batch = sub.receive_batch(2, Duration::ZERO).await.unwrap();
        assert_eq!(batch[0].correlation_id(), Some("abc"));
        assert_eq!(batch[1].correlation_id(), None);
        assert_eq!(batch[1].correlation_id_or_null(), "null");
    }

    #[tokio::test]
    async fn test_existing_correlation_id_is_kept() {
        let topic = InMemoryTopic::new("orders");
        let sub = topic.subscribe("billing");
        let publisher = TopicPublisher::new(topic);

        let message = Message::new(Vec::new()).with_user_property(CORRELATION_ID_PROPERTY, "given");
        publisher.publish_message(message).await;

        let batch = sub.receive_batch(1, Duration::ZERO).await.unwrap();
        assert_eq!(batch[0].correlation_id(), Some("given"));
    }
}
