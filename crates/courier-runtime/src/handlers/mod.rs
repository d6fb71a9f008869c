//! # Sample Handlers
//!
//! Handlers used by the demo scenarios. Failures are injected by message
//! sequence number so every run behaves the same.

pub mod foo;

pub use foo::{FailurePlan, Foo, FooHandler};

/// The dependency behind the handler is unreachable.
pub const EXTERNAL_PROVIDER_OFFLINE: &str = "ExternalProviderOffline";

/// Worth retrying.
pub const SAMPLE_TRANSIENT: &str = "SampleTransient";

/// Will never succeed.
pub const SAMPLE_PERMANENT: &str = "SamplePermanent";
