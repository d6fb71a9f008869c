//! # Error Types
//!
//! Errors raised while encoding or decoding message bodies.

use thiserror::Error;

/// Errors related to message bodies.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The event could not be serialized into a message body.
    #[error("Failed to encode `{message_type}`: {source}")]
    Encode {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body could not be deserialized into the declared event type.
    #[error("Failed to decode `{message_type}`: {source}")]
    Decode {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },
}
