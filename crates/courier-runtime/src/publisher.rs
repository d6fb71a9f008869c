//! Demo publisher: a steady stream of `Foo` events.

use crate::handlers::Foo;
use shared_bus::{EventPublisher, PublishError, TopicPublisher};
use shared_types::{Event, Message, MESSAGE_TYPE_PROPERTY};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct DemoPublisher {
    publisher: TopicPublisher,
    interval: Duration,
    malformed_every: Option<u64>,
}

impl DemoPublisher {
    pub fn new(publisher: TopicPublisher, interval: Duration) -> Self {
        Self {
            publisher,
            interval,
            malformed_every: None,
        }
    }

    /// Replace every `n`th event with a body that does not decode as `Foo`.
    #[must_use]
    pub fn with_malformed_every(mut self, n: Option<u64>) -> Self {
        self.malformed_every = n.filter(|n| *n > 0);
        self
    }

    /// Publish until `shutdown` turns true. Returns the number published.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<u64, PublishError> {
        let mut ticker = tokio::time::interval(self.interval);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = ticker.tick() => {}
            }

            seq += 1;
            if self.malformed_every.is_some_and(|n| seq % n == 0) {
                let message = Message::new(b"not json".to_vec())
                    .with_user_property(MESSAGE_TYPE_PROPERTY, Foo::MESSAGE_TYPE);
                self.publisher.publish_message(message).await;
                debug!(seq, "Published malformed Foo");
            } else {
                self.publisher.publish(&Foo { seq }).await?;
            }
        }

        info!(published = seq, "Publisher stopped");
        Ok(seq)
    }
}
