//! # Provider Settings
//!
//! Serializable provider settings, read from `SECRETS_CONFIG_*` environment
//! variables or a TOML document.

use crate::config::ProviderOptions;
use crate::errors::{Result, SecretsError};
use crate::secrets::{FilterKey, ListSecretsFilter};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

const ENV_PREFIX: &str = "SECRETS_CONFIG_";

/// Settings that can be expressed outside of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ProviderSettings {
    /// Polling interval in seconds; absent disables polling
    #[validate(range(min = 1, message = "Polling interval must be at least 1 second"))]
    pub polling_interval_secs: Option<u64>,

    /// Use batched retrieval
    pub use_batch_fetch: bool,

    /// Skip secrets reported missing
    pub ignore_missing_values: bool,

    /// Explicit secret identifiers
    #[validate(custom(function = "validate_identifiers"))]
    pub accepted_secret_arns: Vec<String>,

    /// Server-side name prefix filter
    pub name_prefix: Option<String>,

    /// Version stage requested for every secret (e.g. `AWSCURRENT`)
    pub version_stage: Option<String>,

    /// Logging configuration
    #[validate(nested)]
    pub logging: LoggingSettings,
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

fn validate_identifiers(identifiers: &[String]) -> std::result::Result<(), ValidationError> {
    if identifiers.iter().any(|id| id.trim().is_empty()) {
        let mut error = ValidationError::new("blank_identifier");
        error.message = Some("Secret identifiers cannot be blank".into());
        return Err(error);
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(name: &str) -> Result<bool> {
    match env_var(name) {
        None => Ok(false),
        Some(raw) => raw.trim().parse::<bool>().map_err(|e| {
            SecretsError::config(format!("Invalid {}{}: {}", ENV_PREFIX, name, e))
        }),
    }
}

impl ProviderSettings {
    /// Read settings from `SECRETS_CONFIG_*` environment variables.
    ///
    /// - `SECRETS_CONFIG_POLLING_INTERVAL_SECS`
    /// - `SECRETS_CONFIG_USE_BATCH_FETCH`
    /// - `SECRETS_CONFIG_IGNORE_MISSING_VALUES`
    /// - `SECRETS_CONFIG_ACCEPTED_SECRET_ARNS` (comma separated)
    /// - `SECRETS_CONFIG_NAME_PREFIX`
    /// - `SECRETS_CONFIG_VERSION_STAGE`
    /// - `SECRETS_CONFIG_LOG_LEVEL`, `SECRETS_CONFIG_LOG_JSON`
    pub fn from_env() -> Result<Self> {
        let polling_interval_secs = env_var("POLLING_INTERVAL_SECS")
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    SecretsError::config(format!("Invalid polling interval: {}", e))
                })
            })
            .transpose()?;

        let accepted_secret_arns = env_var("ACCEPTED_SECRET_ARNS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let settings = Self {
            polling_interval_secs,
            use_batch_fetch: env_bool("USE_BATCH_FETCH")?,
            ignore_missing_values: env_bool("IGNORE_MISSING_VALUES")?,
            accepted_secret_arns,
            name_prefix: env_var("NAME_PREFIX"),
            version_stage: env_var("VERSION_STAGE"),
            logging: LoggingSettings {
                level: env_var("LOG_LEVEL").unwrap_or_else(|| LoggingSettings::default().level),
                json: env_bool("LOG_JSON")?,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let settings: Self = toml::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SecretsError::from)
    }

    /// Convert into provider options with default predicate and key naming.
    pub fn into_options(self) -> ProviderOptions {
        let mut options = ProviderOptions::default()
            .with_batch_fetch(self.use_batch_fetch)
            .with_ignore_missing_values(self.ignore_missing_values)
            .with_accepted_secret_arns(self.accepted_secret_arns);

        if let Some(secs) = self.polling_interval_secs {
            options = options.with_polling_interval(Duration::from_secs(secs));
        }
        if let Some(prefix) = self.name_prefix {
            options = options.with_list_filter(ListSecretsFilter::new(FilterKey::Name, [prefix]));
        }
        if let Some(stage) = self.version_stage {
            options = options.with_secret_value_request(move |request, _| {
                request.version_stage = Some(stage.clone());
            });
        }
        options
    }
}
