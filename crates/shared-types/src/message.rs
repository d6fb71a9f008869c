//! # Message
//!
//! One message as it travels from publisher to subscriber.
//!
//! ```text
//! ┌──────────────────────── Message ────────────────────────┐
//! │ id             MessageId (assigned by the publisher)     │
//! │ body           JSON bytes                                │
//! │ user props     MessageType, PBCorrelationId, ...         │
//! │ system props   lock_token, delivery_count (transport)    │
//! └──────────────────────────────────────────────────────────┘
//! ```

use crate::errors::MessageError;
use crate::event::Event;
use crate::{
    CORRELATION_ID_PROPERTY, MESSAGE_TYPE_PROPERTY, NULL_CORRELATION_ID, UNKNOWN_MESSAGE_TYPE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Publisher-assigned message identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle identifying one delivery of a message.
///
/// A redelivery carries a new token; a token from an expired delivery can no
/// longer settle the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(pub Uuid);

impl LockToken {
    /// Generate a fresh lock token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Properties stamped by the transport on receive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProperties {
    /// Lock token of the current delivery. `None` until received.
    pub lock_token: Option<LockToken>,
    /// Number of times this message has been delivered, this delivery included.
    pub delivery_count: u32,
}

/// A message with body, user properties and transport properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Publisher-assigned identifier.
    pub id: MessageId,
    /// Serialized payload.
    pub body: Vec<u8>,
    /// Application properties (`MessageType`, correlation id, ...).
    pub user_properties: HashMap<String, String>,
    /// Transport properties.
    pub system_properties: SystemProperties,
}

impl Message {
    /// Create a message with the given body and no properties.
    #[must_use]
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            id: MessageId::new(),
            body,
            user_properties: HashMap::new(),
            system_properties: SystemProperties::default(),
        }
    }

    /// Encode an event as JSON and tag it with its message type.
    pub fn from_event<E: Event>(event: &E) -> Result<Self, MessageError> {
        let body = serde_json::to_vec(event).map_err(|source| MessageError::Encode {
            message_type: E::MESSAGE_TYPE.to_string(),
            source,
        })?;
        Ok(Self::new(body).with_user_property(MESSAGE_TYPE_PROPERTY, E::MESSAGE_TYPE))
    }

    /// Decode the body as the given event type.
    pub fn decode<E: Event>(&self) -> Result<E, MessageError> {
        serde_json::from_slice(&self.body).map_err(|source| MessageError::Decode {
            message_type: E::MESSAGE_TYPE.to_string(),
            source,
        })
    }

    /// Set a user property, replacing any previous value.
    #[must_use]
    pub fn with_user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }

    /// The `MessageType` user property, if present.
    pub fn message_type(&self) -> Option<&str> {
        self.user_properties
            .get(MESSAGE_TYPE_PROPERTY)
            .map(String::as_str)
    }

    /// The correlation id user property, if present.
    pub fn correlation_id(&self) -> Option<&str> {
        self.user_properties
            .get(CORRELATION_ID_PROPERTY)
            .map(String::as_str)
    }

    /// Message type for logging, `"Unknown Message Type"` when absent.
    pub fn message_type_or_unknown(&self) -> &str {
        self.message_type().unwrap_or(UNKNOWN_MESSAGE_TYPE)
    }

    /// Correlation id for logging, `"null"` when absent.
    pub fn correlation_id_or_null(&self) -> &str {
        self.correlation_id().unwrap_or(NULL_CORRELATION_ID)
    }

    /// Lock token of the current delivery.
    pub fn lock_token(&self) -> Option<LockToken> {
        self.system_properties.lock_token
    }

    /// Delivery count of the current delivery.
    pub fn delivery_count(&self) -> u32 {
        self.system_properties.delivery_count
    }
}
