//! # Configuration Management
//!
//! [`ProviderOptions`] is the full option bag handed to the provider, including
//! the closure-valued hooks. [`ProviderSettings`] is its serializable subset,
//! loadable from environment variables or TOML and convertible with
//! [`ProviderSettings::into_options`].

pub mod settings;

pub use settings::{LoggingSettings, ProviderSettings};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::secrets::{
    BatchGetSecretValueRequest, GetSecretValueRequest, ListSecretsFilter, SecretDescriptor,
};

/// Client-side predicate deciding whether a listed secret is loaded.
pub type SecretFilter = Arc<dyn Fn(&SecretDescriptor) -> bool + Send + Sync>;

/// Maps `(descriptor, flattened path)` to the final configuration key.
pub type KeyGenerator = Arc<dyn Fn(&SecretDescriptor, &str) -> String + Send + Sync>;

/// Customizes a single value request before it is sent.
pub type ConfigureSecretValueRequest =
    Arc<dyn Fn(&mut GetSecretValueRequest, &SecretDescriptor) + Send + Sync>;

/// Customizes a batch value request before its first page is sent.
pub type ConfigureBatchSecretValueRequest =
    Arc<dyn Fn(&mut BatchGetSecretValueRequest, &[SecretDescriptor]) + Send + Sync>;

/// Options controlling discovery, retrieval, key naming, and polling.
///
/// The provider takes ownership of the options at construction and never
/// mutates them afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let options = ProviderOptions::default()
///     .with_polling_interval(Duration::from_secs(300))
///     .with_ignore_missing_values(true)
///     .with_secret_filter(|secret| secret.name.starts_with("prod/"));
/// ```
#[derive(Clone)]
pub struct ProviderOptions {
    /// Background polling interval; `None` or zero disables polling
    pub polling_interval: Option<Duration>,

    /// Use batched retrieval instead of one call per secret
    pub use_batch_fetch: bool,

    /// Skip secrets the store reports as missing instead of failing the load
    pub ignore_missing_values: bool,

    /// Explicit secret identifiers; when non-empty, listing is skipped entirely
    pub accepted_secret_arns: Vec<String>,

    /// Server-side filters for the listing call
    pub list_secrets_filters: Vec<ListSecretsFilter>,

    /// Client-side predicate over listed secrets
    pub secret_filter: SecretFilter,

    /// Configuration key naming policy
    pub key_generator: KeyGenerator,

    /// Single value request hook
    pub configure_secret_value_request: Option<ConfigureSecretValueRequest>,

    /// Batch value request hook
    pub configure_batch_secret_value_request: Option<ConfigureBatchSecretValueRequest>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            polling_interval: None,
            use_batch_fetch: false,
            ignore_missing_values: false,
            accepted_secret_arns: Vec::new(),
            list_secrets_filters: Vec::new(),
            secret_filter: Arc::new(|_: &SecretDescriptor| true),
            key_generator: Arc::new(|_: &SecretDescriptor, key: &str| key.to_string()),
            configure_secret_value_request: None,
            configure_batch_secret_value_request: None,
        }
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("polling_interval", &self.polling_interval)
            .field("use_batch_fetch", &self.use_batch_fetch)
            .field("ignore_missing_values", &self.ignore_missing_values)
            .field("accepted_secret_arns", &self.accepted_secret_arns)
            .field("list_secrets_filters", &self.list_secrets_filters)
            .field("configure_secret_value_request", &self.configure_secret_value_request.is_some())
            .field(
                "configure_batch_secret_value_request",
                &self.configure_batch_secret_value_request.is_some(),
            )
            .finish_non_exhaustive()
    }
}

impl ProviderOptions {
    /// Set the polling interval.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    /// Toggle batched retrieval.
    pub fn with_batch_fetch(mut self, enabled: bool) -> Self {
        self.use_batch_fetch = enabled;
        self
    }

    /// Toggle skipping of missing secrets.
    pub fn with_ignore_missing_values(mut self, enabled: bool) -> Self {
        self.ignore_missing_values = enabled;
        self
    }

    /// Load exactly these secrets instead of listing.
    pub fn with_accepted_secret_arns<I, S>(mut self, arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_secret_arns = arns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a server-side listing filter.
    pub fn with_list_filter(mut self, filter: ListSecretsFilter) -> Self {
        self.list_secrets_filters.push(filter);
        self
    }

    /// Set the client-side secret predicate.
    pub fn with_secret_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&SecretDescriptor) -> bool + Send + Sync + 'static,
    {
        self.secret_filter = Arc::new(filter);
        self
    }

    /// Set the key naming policy.
    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&SecretDescriptor, &str) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(generator);
        self
    }

    /// Set the single value request hook.
    pub fn with_secret_value_request<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut GetSecretValueRequest, &SecretDescriptor) + Send + Sync + 'static,
    {
        self.configure_secret_value_request = Some(Arc::new(configure));
        self
    }

    /// Set the batch value request hook.
    pub fn with_batch_secret_value_request<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut BatchGetSecretValueRequest, &[SecretDescriptor]) + Send + Sync + 'static,
    {
        self.configure_batch_secret_value_request = Some(Arc::new(configure));
        self
    }

    /// True when listing is bypassed by an explicit allow-list.
    pub fn uses_allow_list(&self) -> bool {
        !self.accepted_secret_arns.is_empty()
    }

    /// The polling interval, if polling should run.
    pub fn effective_polling_interval(&self) -> Option<Duration> {
        self.polling_interval.filter(|interval| !interval.is_zero())
    }
}
