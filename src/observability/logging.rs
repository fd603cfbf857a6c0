//! # Structured Logging
//!
//! Installs a `tracing-subscriber` formatter for hosts that do not bring their
//! own. `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingSettings;
use crate::errors::{Result, SecretsError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already installed (for
/// example by the host or by another test), which is not treated as an error.
pub fn init_logging(settings: &LoggingSettings) -> Result<bool> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&settings.level),
    }
    .map_err(|e| SecretsError::config(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if settings.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %settings.level, json = settings.json, "Logging initialized");
    }
    Ok(installed)
}
