//! # Shared Types Crate
//!
//! The message model exchanged between publishers, the transport and the
//! subscriber pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: property keys and logging fallbacks live here
//!   so the publisher and the subscriber can never disagree on them.
//! - **Transport-owned system properties**: lock token and delivery count are
//!   stamped by the transport on receive; user code only reads them.
//! - **User properties are strings**: the `MessageType` tag and correlation id
//!   are plain string entries, so routing never needs to decode the body.

pub mod errors;
pub mod event;
pub mod message;

pub use errors::*;
pub use event::Event;
pub use message::{LockToken, Message, MessageId, SystemProperties};

/// User property carrying the message type tag.
pub const MESSAGE_TYPE_PROPERTY: &str = "MessageType";

/// User property carrying the correlation id.
pub const CORRELATION_ID_PROPERTY: &str = "PBCorrelationId";

/// Logged in place of a missing `MessageType` property.
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown Message Type";

/// Logged in place of a missing correlation id.
pub const NULL_CORRELATION_ID: &str = "null";
