//! # Courier Runtime Library
//!
//! Wiring for the `courier-runtime` binary, exposed as a library so the
//! pieces can be tested without a process.
//!
//! ## Modules
//!
//! - `config/` - TOML loading (`--config` or `COURIER_CONFIG`)
//! - `scenario/` - preset configurations mirroring the demo programs
//! - `handlers/` - sample `Foo` handler with deterministic failures
//! - `adapters/` - Prometheus-backed monitoring ports
//! - `wiring/` - transport + pipeline + subscriber assembly
//! - `publisher/` - demo event stream

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod publisher;
pub mod scenario;
pub mod wiring;

pub use publisher::DemoPublisher;
pub use scenario::Scenario;
pub use wiring::SubscriberHost;
