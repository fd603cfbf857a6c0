//! Snapshot fetching, comparison, and publication.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::catalog::SecretCatalog;
use super::retriever::SecretRetriever;
use super::snapshot::{Snapshot, SnapshotBuilder};
use super::Notifier;
use crate::config::ProviderOptions;
use crate::errors::{Result, SecretsError};
use crate::secrets::SecretsManagerClient;

/// The published configuration together with its change counter.
#[derive(Debug, Clone, Default)]
pub struct ReloadState {
    pub snapshot: Arc<Snapshot>,
    /// Advances by one for every publish that notified subscribers
    pub generation: u64,
    pub loaded: bool,
}

/// Result of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A different snapshot was published and subscribers were notified
    Changed { added: usize, removed: usize },
    /// The fetched snapshot equals the published one
    Unchanged,
}

/// Subscription to configuration changes.
///
/// Created by [`ReloadEngine::subscribe`]; the current state counts as seen,
/// so [`ChangeToken::changed`] only resolves for later publishes.
#[derive(Debug, Clone)]
pub struct ChangeToken {
    receiver: watch::Receiver<ReloadState>,
}

impl ChangeToken {
    /// Wait for the next change and return the new snapshot.
    ///
    /// Fails with [`SecretsError::Cancelled`] once the provider is gone.
    pub async fn changed(&mut self) -> Result<Arc<Snapshot>> {
        self.receiver.changed().await.map_err(|_| SecretsError::Cancelled)?;
        Ok(self.receiver.borrow_and_update().snapshot.clone())
    }

    /// True when a change was published since the last [`ChangeToken::changed`].
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    pub fn generation(&self) -> u64 {
        self.receiver.borrow().generation
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.receiver.borrow().snapshot.clone()
    }
}

/// Fetches a full snapshot and publishes it.
///
/// Publication and comparison happen inside one `send_if_modified` call, so
/// concurrent reloads serialize there and the last one to finish wins.
pub struct ReloadEngine {
    catalog: SecretCatalog,
    retriever: SecretRetriever,
    builder: SnapshotBuilder,
    notifier: Notifier,
    state: watch::Sender<ReloadState>,
}

impl ReloadEngine {
    pub(crate) fn new(
        client: Arc<dyn SecretsManagerClient>,
        options: Arc<ProviderOptions>,
        notifier: Notifier,
    ) -> Self {
        Self {
            catalog: SecretCatalog::new(client.clone(), options.clone()),
            retriever: SecretRetriever::new(client, options.clone(), notifier.clone()),
            builder: SnapshotBuilder::new(options.key_generator.clone()),
            notifier,
            state: watch::Sender::new(ReloadState::default()),
        }
    }

    async fn fetch(&self, token: &CancellationToken) -> Result<Snapshot> {
        let candidates = self.catalog.list_candidates(token).await?;
        let retrieved = self.retriever.retrieve(candidates, token).await?;
        self.builder.build(&retrieved)
    }

    /// Fetch and publish the first snapshot without notifying subscribers.
    ///
    /// Once a snapshot has been published, a repeated load compares and
    /// notifies exactly like [`ReloadEngine::reload`].
    pub async fn load(&self, token: &CancellationToken) -> Result<()> {
        self.notifier.emit(|o| o.load_started());
        let started = Instant::now();

        let snapshot = match self.fetch(token).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.notifier.emit(|o| o.load_failed(&err, started.elapsed()));
                return Err(err);
            }
        };

        let key_count = snapshot.len();
        let outcome = self.publish(snapshot, true);

        let elapsed = started.elapsed();
        self.notifier.emit(|o| o.load_succeeded(key_count, elapsed));
        if let ReloadOutcome::Changed { added, removed } = outcome {
            self.notifier.emit(|o| o.reload_changed(added, removed, key_count, elapsed));
        }
        Ok(())
    }

    /// Fetch and publish if different from the current snapshot.
    ///
    /// On error the published snapshot is left untouched.
    pub async fn reload(&self, token: &CancellationToken) -> Result<ReloadOutcome> {
        self.notifier.emit(|o| o.reload_started());
        let started = Instant::now();

        let snapshot = match self.fetch(token).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.notifier.emit(|o| o.reload_failed(&err));
                return Err(err);
            }
        };

        let key_count = snapshot.len();
        let outcome = self.publish(snapshot, false);

        let elapsed = started.elapsed();
        match outcome {
            ReloadOutcome::Changed { added, removed } => {
                self.notifier.emit(|o| o.reload_changed(added, removed, key_count, elapsed));
            }
            ReloadOutcome::Unchanged => self.notifier.emit(|o| o.reload_unchanged(elapsed)),
        }
        Ok(outcome)
    }

    /// Compare and swap in one critical section.
    ///
    /// With `silent_first` the Empty to Loaded transition is published without
    /// a notification; every later publish notifies only when the pairs differ.
    fn publish(&self, snapshot: Snapshot, silent_first: bool) -> ReloadOutcome {
        let mut outcome = ReloadOutcome::Unchanged;
        self.state.send_if_modified(|state| {
            if silent_first && !state.loaded {
                state.snapshot = Arc::new(snapshot);
                state.loaded = true;
                return false;
            }
            if *state.snapshot == snapshot {
                return false;
            }
            let diff = snapshot.diff(&state.snapshot);
            outcome = ReloadOutcome::Changed { added: diff.added, removed: diff.removed };
            state.snapshot = Arc::new(snapshot);
            state.generation += 1;
            state.loaded = true;
            true
        });
        outcome
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.borrow().snapshot.clone()
    }

    pub fn state(&self) -> ReloadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> ChangeToken {
        ChangeToken { receiver: self.state.subscribe() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::InMemorySecretsManager;

    fn engine(store: &InMemorySecretsManager, options: ProviderOptions) -> ReloadEngine {
        ReloadEngine::new(Arc::new(store.clone()), Arc::new(options), Notifier::default())
    }

    #[tokio::test]
    async fn test_load_publishes_without_notifying() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", r#"{"host":"h"}"#).await;
        let engine = engine(&store, ProviderOptions::default());
        let token = engine.subscribe();

        engine.load(&CancellationToken::new()).await.unwrap();

        assert!(!token.has_changed());
        assert_eq!(token.generation(), 0);
        assert_eq!(engine.snapshot().get("db:host"), Some("h"));
        assert!(engine.state().loaded);
    }

    #[tokio::test]
    async fn test_reload_notifies_only_on_change() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", r#"{"host":"h"}"#).await;
        let engine = engine(&store, ProviderOptions::default());
        engine.load(&CancellationToken::new()).await.unwrap();
        let mut token = engine.subscribe();

        let outcome = engine.reload(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReloadOutcome::Unchanged);
        assert!(!token.has_changed());

        store.put_text("db", r#"{"host":"h2","port":1}"#).await;
        let outcome = engine.reload(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReloadOutcome::Changed { added: 2, removed: 1 });
        assert!(token.has_changed());

        let snapshot = token.changed().await.unwrap();
        assert_eq!(snapshot.get("db:host"), Some("h2"));
        assert_eq!(token.generation(), 1);
        assert!(!token.has_changed());
    }

    #[tokio::test]
    async fn test_repeated_load_notifies_on_change() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "v1").await;
        let engine = engine(&store, ProviderOptions::default());
        engine.load(&CancellationToken::new()).await.unwrap();
        let mut token = engine.subscribe();

        engine.load(&CancellationToken::new()).await.unwrap();
        assert!(!token.has_changed());
        assert_eq!(token.generation(), 0);

        store.put_text("db", "v2").await;
        engine.load(&CancellationToken::new()).await.unwrap();
        assert!(token.has_changed());
        assert_eq!(token.changed().await.unwrap().get("db"), Some("v2"));
        assert_eq!(token.generation(), 1);
        assert!(!token.has_changed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reloads_count_every_change() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "v0").await;
        let engine = Arc::new(engine(&store, ProviderOptions::default()));
        engine.load(&CancellationToken::new()).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 1..=16 {
                    store.put_text("db", format!("v{i}")).await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let reloads: Vec<_> = (0..32)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.reload(&CancellationToken::new()).await })
            })
            .collect();

        let mut changed = 0;
        for reload in reloads {
            if let ReloadOutcome::Changed { .. } = reload.await.unwrap().unwrap() {
                changed += 1;
            }
        }
        writer.await.unwrap();
        assert_eq!(engine.state().generation, changed);

        // Settles on the final value regardless of completion order
        engine.reload(&CancellationToken::new()).await.unwrap();
        let outcome = engine.reload(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ReloadOutcome::Unchanged);
        assert_eq!(engine.snapshot().get("db"), Some("v16"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_snapshot() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", r#"{"host":"h"}"#).await;
        let engine = engine(&store, ProviderOptions::default());
        engine.load(&CancellationToken::new()).await.unwrap();
        let token = engine.subscribe();

        store.put_text("db", r#"{"host":null}"#).await;
        let err = engine.reload(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SecretsError::Format { .. }));
        assert_eq!(engine.snapshot().get("db:host"), Some("h"));
        assert!(!token.has_changed());
    }

    #[tokio::test]
    async fn test_cancelled_reload_is_distinct() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "v").await;
        let engine = engine(&store, ProviderOptions::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(engine.reload(&cancel).await.unwrap_err().is_cancelled());
        assert!(!engine.state().loaded);
    }

    #[tokio::test]
    async fn test_change_token_fails_when_engine_dropped() {
        let store = InMemorySecretsManager::new();
        let engine = engine(&store, ProviderOptions::default());
        let mut token = engine.subscribe();
        drop(engine);
        assert!(token.changed().await.unwrap_err().is_cancelled());
    }
}
