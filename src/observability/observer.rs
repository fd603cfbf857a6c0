//! Reload lifecycle events.
//!
//! The provider never logs on its own. It reports lifecycle events to an
//! optional [`ReloadObserver`]; [`TracingObserver`] turns them into `tracing`
//! events and metrics.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::metrics::ProviderMetrics;
use crate::errors::SecretsError;
use crate::secrets::SecretDescriptor;

/// Why a secret contributed no keys to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The store reported the secret missing and missing values are ignored
    Missing,
    /// The secret has a binary payload or no payload at all
    NonText,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NonText => "non_text",
        }
    }
}

/// Sink for provider lifecycle events.
///
/// Every method has an empty default, so implementors only override what they
/// care about.
pub trait ReloadObserver: Send + Sync {
    fn load_started(&self) {}

    fn load_succeeded(&self, _key_count: usize, _elapsed: Duration) {}

    fn load_failed(&self, _error: &SecretsError, _elapsed: Duration) {}

    fn reload_started(&self) {}

    /// A reload published a different snapshot.
    fn reload_changed(&self, _added: usize, _removed: usize, _key_count: usize, _elapsed: Duration) {}

    /// A reload built a snapshot equal to the published one.
    fn reload_unchanged(&self, _elapsed: Duration) {}

    fn reload_failed(&self, _error: &SecretsError) {}

    fn polling_started(&self, _interval: Duration) {}

    fn polling_stopped(&self) {}

    /// A background reload failed; the loop keeps running.
    fn polling_error(&self, _error: &SecretsError, _interval: Duration) {}

    fn secret_skipped(&self, _secret: &SecretDescriptor, _reason: SkipReason) {}
}

/// Observer that emits `tracing` events and records metrics.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    metrics: ProviderMetrics,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self { metrics: ProviderMetrics::new() }
    }
}

impl ReloadObserver for TracingObserver {
    fn load_started(&self) {
        debug!("Loading configuration from secrets manager");
    }

    fn load_succeeded(&self, key_count: usize, elapsed: Duration) {
        info!(
            keys = key_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Configuration loaded from secrets manager"
        );
        self.metrics.record_load(true, Some(key_count), elapsed);
    }

    fn load_failed(&self, error: &SecretsError, elapsed: Duration) {
        error!(
            error = %error,
            elapsed_ms = elapsed.as_millis() as u64,
            "Failed to load configuration from secrets manager"
        );
        self.metrics.record_load(false, None, elapsed);
    }

    fn reload_started(&self) {
        debug!("Reloading configuration from secrets manager");
    }

    fn reload_changed(&self, added: usize, removed: usize, key_count: usize, elapsed: Duration) {
        info!(
            added,
            removed,
            keys = key_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Configuration changed; notifying subscribers"
        );
        self.metrics.record_reload("changed", Some(elapsed));
        self.metrics.update_key_count(key_count);
    }

    fn reload_unchanged(&self, elapsed: Duration) {
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Configuration unchanged");
        self.metrics.record_reload("unchanged", Some(elapsed));
    }

    fn reload_failed(&self, error: &SecretsError) {
        if error.is_cancelled() {
            debug!("Configuration reload cancelled");
        } else {
            warn!(error = %error, "Configuration reload failed; keeping previous values");
        }
        self.metrics.record_reload("error", None);
    }

    fn polling_started(&self, interval: Duration) {
        info!(interval_secs = interval.as_secs_f64(), "Started polling secrets manager");
    }

    fn polling_stopped(&self) {
        info!("Stopped polling secrets manager");
    }

    fn polling_error(&self, error: &SecretsError, interval: Duration) {
        warn!(
            error = %error,
            retry_in_secs = interval.as_secs_f64(),
            "Background configuration reload failed; keeping previous values"
        );
        self.metrics.record_poll_error();
    }

    fn secret_skipped(&self, secret: &SecretDescriptor, reason: SkipReason) {
        warn!(
            secret_name = %secret.name,
            secret_id = %secret.id,
            reason = reason.as_str(),
            "Secret skipped"
        );
        self.metrics.record_skipped_secret(reason.as_str());
    }
}
