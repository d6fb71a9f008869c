//! Error types for the subscriber pipeline

use shared_types::LockToken;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Boxed source error carried by a [`HandlerError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Kind tag given to bodies that cannot be decoded into the handler's event.
pub const MALFORMED_PAYLOAD: &str = "MalformedPayload";

/// Everything that can fail a pipeline invocation.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Raised by user handler code.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The circuit breaker rejected the call without running it.
    #[error("Circuit open: call rejected without dispatch")]
    CircuitOpen,

    /// No handler is registered for the message type.
    #[error("No handler registered for message type `{message_type}`")]
    NoHandler {
        /// Message type tag that had no handler.
        message_type: String,
    },

    /// Settling the message with the transport failed.
    #[error(transparent)]
    Receiver(#[from] ReceiverError),

    /// Receiving from the transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProcessingError {
    /// Check if this is a circuit-open rejection rather than a real failure
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen)
    }

    /// Kind tag used by classifiers and circuit breaker predicates.
    ///
    /// Handler errors report their own kind; the other variants report a
    /// fixed tag so they can be named in configuration too.
    pub fn kind(&self) -> &str {
        match self {
            Self::Handler(e) => e.kind(),
            Self::CircuitOpen => "CircuitOpen",
            Self::NoHandler { .. } => "NoHandler",
            Self::Receiver(_) => "Receiver",
            Self::Transport(_) => "Transport",
        }
    }
}

/// An error raised by a message handler.
///
/// Failures are tagged with a kind string instead of being distinguished by
/// type, so routing decisions (dead-letter, trip the breaker, retry) can be
/// driven by configuration.
#[derive(Debug)]
pub struct HandlerError {
    kind: Cow<'static, str>,
    message: String,
    source: Option<BoxError>,
}

impl HandlerError {
    /// Create a handler error of the given kind.
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The body could not be decoded into the handler's event type.
    pub fn malformed_payload(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::new(MALFORMED_PAYLOAD, source.to_string()).with_source(source)
    }

    /// Kind tag of this error.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors from the message receiver capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReceiverError {
    /// The message was never received, so it has no lock to settle.
    #[error("Message has no lock token")]
    MissingLockToken,

    /// The lock expired or the message was already settled.
    #[error("Lock lost for token {0}")]
    LockLost(LockToken),

    /// The transport is shut down.
    #[error("Receiver closed")]
    Closed,
}

/// Errors from the message source collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The source is closed and will produce no more batches.
    #[error("Message source closed")]
    Closed,

    /// Receive failed; the loop may retry.
    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Startup configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A pipeline scope has no behaviours
    #[error("{scope} pipeline has no behaviours")]
    EmptyPipeline {
        /// Scope name
        scope: &'static str,
    },

    /// A scope lacks its disposing behaviour (outermost for messages)
    #[error("{scope} pipeline is missing its disposing behaviour, found `{found}` first")]
    MissingDisposition {
        /// Scope name
        scope: &'static str,
        /// Name of the behaviour found first
        found: String,
    },

    /// A disposing behaviour appears where it may not
    #[error("{scope} pipeline declares disposing behaviour `{name}` at position {position}; only one is allowed, outermost for messages")]
    MisplacedDisposition {
        /// Scope name
        scope: &'static str,
        /// Behaviour name
        name: String,
        /// Zero-based position
        position: usize,
    },

    /// The batch scope declares a circuit breaker the message scope never feeds
    #[error("batch circuit_breaker requires a message circuit_breaker to record outcomes")]
    UnrecordedCircuitBreaker,

    /// Behaviour name not recognised for this scope
    #[error("Unknown {scope} behaviour `{name}`")]
    UnknownBehaviour {
        /// Scope name
        scope: &'static str,
        /// Behaviour name
        name: String,
    },

    /// A behaviour needs shared state that was not supplied
    #[error("Behaviour `{0}` requires a component that was not configured")]
    MissingComponent(String),

    /// Invalid rate limiter configuration
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid circuit breaker configuration
    #[error("Invalid circuit breaker: {0}")]
    InvalidCircuitBreaker(String),

    /// Invalid intake configuration
    #[error("Invalid intake: {0}")]
    InvalidIntake(String),

    /// Two handlers registered for the same message type
    #[error("Duplicate handler for message type `{0}`")]
    DuplicateHandler(String),

    /// A kind is listed as both transient and permanent
    #[error("Failure kind `{0}` is listed as both transient and permanent")]
    ConflictingClassification(String),
}
