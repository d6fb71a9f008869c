//! Structured logging initialisation.
//!
//! JSON lines are flat: fields recorded on the event plus the span list.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Fails with [`TelemetryError::AlreadyInitialised`] if a global subscriber
/// is already set, and with [`TelemetryError::Config`] for a bad filter.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level `{}`: {e}", config.log_level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_logs {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|_| TelemetryError::AlreadyInitialised)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        filter = %config.log_level,
        "Logging initialised"
    );
    Ok(())
}
