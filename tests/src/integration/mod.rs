//! Cross-crate scenarios.

mod circuit_breaking;
mod non_transient;
mod poison_messages;
mod rate_limiting;
mod shutdown;
