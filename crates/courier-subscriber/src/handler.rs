//! Message handlers and the registry that routes message types to them.

use crate::error::{ConfigError, HandlerError};
use async_trait::async_trait;
use shared_types::{Event, Message};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handles raw messages of one message type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process a message. An error leaves disposition to the pipeline.
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

/// Handles one decoded event type.
///
/// Registered through [`HandlerRegistryBuilder::register`], which routes
/// messages tagged `Self::Event::MESSAGE_TYPE` here after decoding the body.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Event this handler consumes.
    type Event: Event;

    /// Process a decoded event. `message` gives access to its properties.
    async fn handle(&self, event: Self::Event, message: &Message) -> Result<(), HandlerError>;
}

/// Decodes the body before calling an [`EventHandler`].
struct Decoding<H> {
    handler: Arc<H>,
}

#[async_trait]
impl<H: EventHandler> MessageHandler for Decoding<H> {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let event = message
            .decode::<H::Event>()
            .map_err(HandlerError::malformed_payload)?;
        self.handler.handle(event, message).await
    }
}

/// Message type to handler mapping. Immutable once built.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Handler for `message_type`, if one is registered.
    pub fn resolve(&self, message_type: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(message_type).cloned()
    }

    /// Registered message types, sorted.
    pub fn message_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("message_types", &self.message_types())
            .finish()
    }
}

/// Collects handlers; duplicates are reported by [`build`](Self::build).
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    duplicate: Option<String>,
}

impl HandlerRegistryBuilder {
    /// Register a typed event handler.
    #[must_use]
    pub fn register<H: EventHandler>(self, handler: H) -> Self {
        self.register_shared(Arc::new(handler))
    }

    /// Register a typed event handler the caller keeps a handle to.
    #[must_use]
    pub fn register_shared<H: EventHandler>(self, handler: Arc<H>) -> Self {
        self.register_raw(<H::Event as Event>::MESSAGE_TYPE, Arc::new(Decoding { handler }))
    }

    /// Register a handler for raw messages of `message_type`.
    #[must_use]
    pub fn register_raw(
        mut self,
        message_type: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let message_type = message_type.into();
        if self.handlers.contains_key(&message_type) {
            self.duplicate.get_or_insert(message_type);
        } else {
            debug!(message_type = %message_type, "Registered message handler");
            self.handlers.insert(message_type, handler);
        }
        self
    }

    pub fn build(self) -> Result<HandlerRegistry, ConfigError> {
        if let Some(message_type) = self.duplicate {
            return Err(ConfigError::DuplicateHandler(message_type));
        }
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}
