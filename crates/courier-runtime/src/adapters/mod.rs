//! # Port Adapters
//!
//! Implementations of the subscriber's outbound monitoring ports backed by
//! the Prometheus collectors in `courier-telemetry`.

pub mod metrics;

pub use metrics::{PrometheusCircuitMonitor, PrometheusStatistics};
