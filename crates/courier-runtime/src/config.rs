//! # Runtime Configuration
//!
//! The subscriber configuration comes from a TOML file named on the command
//! line or in `COURIER_CONFIG`. Without one, the selected scenario's preset
//! is used.

use anyhow::{Context, Result};
use courier_subscriber::SubscriberConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

/// The command-line path wins over `COURIER_CONFIG`.
pub fn resolve_path(cli: Option<PathBuf>) -> Option<PathBuf> {
    cli.or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Read, parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<SubscriberConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SubscriberConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    info!(path = %path.display(), subscriber = %config.subscriber_name, "Loaded configuration");
    Ok(config)
}
