//! Failure classification.
//!
//! Maps a [`ProcessingError`] to a [`FailureKind`] from configured lists of
//! kind tags. Behaviours branch on the returned kind, never on error types.

use crate::error::{ConfigError, ProcessingError, MALFORMED_PAYLOAD};
use std::collections::HashSet;
use std::fmt;

/// Classification of a failed pipeline invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Retrying may succeed; leave the message for redelivery.
    Transient,
    /// Retrying can never succeed; dead-letter the message.
    Permanent,
    /// Not recognised; handled like a transient failure.
    Unclassified,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
            FailureKind::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Data-driven classifier over error kind tags.
#[derive(Clone, Debug, Default)]
pub struct FailureClassifier {
    permanent: HashSet<String>,
    transient: HashSet<String>,
}

impl FailureClassifier {
    /// Build a classifier from kind lists.
    ///
    /// A kind present in both lists is rejected.
    pub fn new<P, T>(permanent: P, transient: T) -> Result<Self, ConfigError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let permanent: HashSet<String> = permanent.into_iter().map(Into::into).collect();
        let transient: HashSet<String> = transient.into_iter().map(Into::into).collect();

        if let Some(kind) = permanent.intersection(&transient).min() {
            return Err(ConfigError::ConflictingClassification(kind.clone()));
        }

        Ok(Self {
            permanent,
            transient,
        })
    }

    /// Classifier with no configured kinds apart from `MalformedPayload`,
    /// which is always permanent.
    pub fn with_defaults() -> Self {
        let mut permanent = HashSet::new();
        permanent.insert(MALFORMED_PAYLOAD.to_string());
        Self {
            permanent,
            transient: HashSet::new(),
        }
    }

    /// Add `MalformedPayload` to the permanent set unless it is configured
    /// as transient.
    #[must_use]
    pub fn with_malformed_payload_permanent(mut self) -> Self {
        if !self.transient.contains(MALFORMED_PAYLOAD) {
            self.permanent.insert(MALFORMED_PAYLOAD.to_string());
        }
        self
    }

    /// Classify an error.
    ///
    /// Circuit-open rejections are never transient or permanent.
    pub fn classify(&self, error: &ProcessingError) -> FailureKind {
        if error.is_circuit_open() {
            return FailureKind::Unclassified;
        }
        self.classify_kind(error.kind())
    }

    /// Classify a bare kind tag.
    pub fn classify_kind(&self, kind: &str) -> FailureKind {
        if self.permanent.contains(kind) {
            FailureKind::Permanent
        } else if self.transient.contains(kind) {
            FailureKind::Transient
        } else {
            FailureKind::Unclassified
        }
    }
}
