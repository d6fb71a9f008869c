//! Adapters for outbound ports that need no external system.

pub mod monitor;

pub use monitor::{CompositeMonitor, TracingCircuitMonitor};
