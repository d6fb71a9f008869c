//! # Courier Telemetry
//!
//! Observability for Courier subscriber processes.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` formatter with an env filter, plain text
//!   for development or JSON for log shippers
//! - **Metrics**: a Prometheus registry with pipeline and circuit breaker
//!   collectors, rendered in the text exposition format
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, PipelineMetrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! let metrics = PipelineMetrics::new()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `courier` | Service name attached to every log line |
//! | `COURIER_LOG_LEVEL` | `info` | Log filter directive, falls back to `RUST_LOG` |
//! | `COURIER_JSON_LOGS` | `false` | Emit JSON log lines |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{CircuitStateLabel, PipelineMetrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Logging already initialised")]
    AlreadyInitialised,

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(#[from] prometheus::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
