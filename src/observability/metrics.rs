//! # Metrics Collection
//!
//! Counters and histograms for configuration loads and reloads. Recording goes
//! through the `metrics` facade, so nothing is exported unless the host
//! application installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::sync::Once;
use std::time::Duration;

static DESCRIBE: Once = Once::new();

/// Metrics recorder for the configuration provider
#[derive(Debug, Clone, Default)]
pub struct ProviderMetrics;

impl ProviderMetrics {
    /// Create a recorder and register metric descriptions once per process.
    pub fn new() -> Self {
        DESCRIBE.call_once(Self::describe);
        Self
    }

    fn describe() {
        describe_counter!(
            "secrets_config_loads_total",
            Unit::Count,
            "Initial configuration loads by status"
        );
        describe_counter!(
            "secrets_config_reloads_total",
            Unit::Count,
            "Configuration reloads by outcome (changed, unchanged, error)"
        );
        describe_gauge!("secrets_config_keys", Unit::Count, "Keys in the published snapshot");
        describe_histogram!(
            "secrets_config_reload_duration_seconds",
            Unit::Seconds,
            "Time spent fetching and building a snapshot"
        );
        describe_counter!(
            "secrets_config_poll_errors_total",
            Unit::Count,
            "Background reloads that failed"
        );
        describe_counter!(
            "secrets_config_skipped_secrets_total",
            Unit::Count,
            "Secrets left out of the snapshot by reason"
        );
    }

    /// Record an initial load outcome
    pub fn record_load(&self, success: bool, key_count: Option<usize>, elapsed: Duration) {
        let status = if success { "success" } else { "error" };
        counter!("secrets_config_loads_total", "status" => status).increment(1);
        histogram!("secrets_config_reload_duration_seconds", "phase" => "load")
            .record(elapsed.as_secs_f64());
        if let Some(count) = key_count {
            gauge!("secrets_config_keys").set(count as f64);
        }
    }

    /// Record a reload outcome: `changed`, `unchanged`, or `error`
    pub fn record_reload(&self, outcome: &'static str, elapsed: Option<Duration>) {
        counter!("secrets_config_reloads_total", "outcome" => outcome).increment(1);
        if let Some(elapsed) = elapsed {
            histogram!("secrets_config_reload_duration_seconds", "phase" => "reload")
                .record(elapsed.as_secs_f64());
        }
    }

    /// Update the published key count
    pub fn update_key_count(&self, count: usize) {
        gauge!("secrets_config_keys").set(count as f64);
    }

    /// Record a failed background reload
    pub fn record_poll_error(&self) {
        counter!("secrets_config_poll_errors_total").increment(1);
    }

    /// Record a secret left out of the snapshot
    pub fn record_skipped_secret(&self, reason: &'static str) {
        counter!("secrets_config_skipped_secrets_total", "reason" => reason).increment(1);
    }
}
