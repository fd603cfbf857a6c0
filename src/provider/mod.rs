//! # Configuration Provider
//!
//! [`SecretsManagerConfigurationProvider`] materializes secrets as a flat,
//! case-insensitive key/value [`Snapshot`] and optionally keeps it fresh by
//! polling.
//!
//! ## Pipeline
//!
//! 1. [`SecretCatalog`] lists candidate secrets (or takes the allow-list)
//! 2. [`SecretRetriever`] fetches their values, singly or in batches of
//!    [`BATCH_CHUNK_SIZE`]
//! 3. [`SnapshotBuilder`] parses and flattens each payload into keys
//! 4. [`ReloadEngine`] compares the result with the published snapshot and
//!    notifies subscribers only when it changed
//!
//! ## Example
//!
//! ```rust,ignore
//! let provider = SecretsManagerConfigurationProvider::new(
//!     Arc::new(client),
//!     ProviderOptions::default().with_polling_interval(Duration::from_secs(300)),
//!     Some(Arc::new(TracingObserver::new())),
//! );
//! provider.load().await?;
//!
//! let mut changes = provider.subscribe();
//! while let Ok(snapshot) = changes.changed().await {
//!     println!("db host is now {:?}", snapshot.get("db:host"));
//! }
//! ```

pub mod catalog;
pub mod engine;
pub mod flatten;
pub mod payload;
pub mod polling;
pub mod retriever;
pub mod snapshot;

pub use catalog::SecretCatalog;
pub use engine::{ChangeToken, ReloadEngine, ReloadOutcome, ReloadState};
pub use flatten::{flatten, Flatten, KEY_DELIMITER};
pub use payload::SecretPayload;
pub use polling::PollerHandle;
pub use retriever::{SecretRetriever, BATCH_CHUNK_SIZE};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotDiff};

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::config::ProviderOptions;
use crate::errors::{Result, SecretsError};
use crate::observability::ReloadObserver;
use crate::secrets::SecretsManagerClient;

/// Run a store call, giving up as soon as `token` is cancelled.
pub(crate) async fn with_cancellation<T, F>(token: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SecretsError::Cancelled),
        result = call => result,
    }
}

/// Optional observer shared by the pipeline stages.
#[derive(Clone, Default)]
pub(crate) struct Notifier(Option<Arc<dyn ReloadObserver>>);

impl Notifier {
    pub(crate) fn new(observer: Option<Arc<dyn ReloadObserver>>) -> Self {
        Self(observer)
    }

    pub(crate) fn emit(&self, event: impl FnOnce(&dyn ReloadObserver)) {
        if let Some(observer) = &self.0 {
            event(observer.as_ref());
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Notifier").field(&self.0.is_some()).finish()
    }
}

/// Configuration provider backed by a secrets manager.
///
/// Dropping the provider cancels background polling; call
/// [`shutdown`](Self::shutdown) to also wait for the task to finish.
pub struct SecretsManagerConfigurationProvider {
    engine: Arc<ReloadEngine>,
    options: Arc<ProviderOptions>,
    notifier: Notifier,
    shutdown: CancellationToken,
    poller: Mutex<Option<PollerHandle>>,
}

impl SecretsManagerConfigurationProvider {
    /// Create a provider. Nothing is fetched until [`load`](Self::load).
    pub fn new(
        client: Arc<dyn SecretsManagerClient>,
        options: ProviderOptions,
        observer: Option<Arc<dyn ReloadObserver>>,
    ) -> Self {
        let options = Arc::new(options);
        let notifier = Notifier::new(observer);
        let engine = Arc::new(ReloadEngine::new(client, options.clone(), notifier.clone()));
        Self { engine, options, notifier, shutdown: CancellationToken::new(), poller: Mutex::new(None) }
    }

    fn poller(&self) -> MutexGuard<'_, Option<PollerHandle>> {
        self.poller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch and publish the initial snapshot, then start polling if an
    /// interval is configured.
    ///
    /// The first successful load does not notify subscribers; calling it again
    /// publishes like [`force_reload`](Self::force_reload). Errors propagate and
    /// leave the published state untouched. Polling is only started after a
    /// successful load, and at most once per provider.
    pub async fn load(&self) -> Result<()> {
        self.engine.load(&self.shutdown).await?;

        if let Some(interval) = self.options.effective_polling_interval() {
            let mut poller = self.poller();
            if poller.is_none() {
                *poller = Some(PollerHandle::spawn(
                    self.engine.clone(),
                    interval,
                    self.shutdown.child_token(),
                    self.notifier.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Reload now, independently of the polling schedule.
    ///
    /// Returns [`SecretsError::Cancelled`] if `token` or the provider's own
    /// shutdown fires first.
    pub async fn force_reload(&self, token: &CancellationToken) -> Result<ReloadOutcome> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SecretsError::Cancelled),
            result = self.engine.reload(token) => result,
        }
    }

    /// Case-insensitive lookup in the current snapshot.
    pub fn get(&self, key: &str) -> Option<String> {
        self.engine.snapshot().get(key).map(str::to_string)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.engine.snapshot()
    }

    /// Subscribe to published changes.
    pub fn subscribe(&self) -> ChangeToken {
        self.engine.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.state().loaded
    }

    pub fn is_polling(&self) -> bool {
        self.poller().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Stop polling and wait for the task to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.poller().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}

impl std::fmt::Debug for SecretsManagerConfigurationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsManagerConfigurationProvider")
            .field("options", &self.options)
            .field("loaded", &self.is_loaded())
            .field("polling", &self.is_polling())
            .finish()
    }
}

impl Drop for SecretsManagerConfigurationProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
