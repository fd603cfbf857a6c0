//! Common test utilities for all integration tests.
//!
//! Provides a seeded in-memory store, a provider constructor, and an observer
//! that records every lifecycle event.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use secretsmanager_config::observability::SkipReason;
use secretsmanager_config::{
    InMemorySecretsManager, ProviderOptions, ReloadObserver, SecretDescriptor, SecretsError,
    SecretsManagerConfigurationProvider,
};

/// Lifecycle events as seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LoadStarted,
    LoadSucceeded { keys: usize },
    LoadFailed,
    ReloadStarted,
    ReloadChanged { added: usize, removed: usize },
    ReloadUnchanged,
    ReloadFailed,
    PollingStarted,
    PollingStopped,
    PollingError(String),
    Skipped { name: String, reason: SkipReason },
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ReloadObserver for RecordingObserver {
    fn load_started(&self) {
        self.push(Event::LoadStarted);
    }

    fn load_succeeded(&self, key_count: usize, _elapsed: Duration) {
        self.push(Event::LoadSucceeded { keys: key_count });
    }

    fn load_failed(&self, _error: &SecretsError, _elapsed: Duration) {
        self.push(Event::LoadFailed);
    }

    fn reload_started(&self) {
        self.push(Event::ReloadStarted);
    }

    fn reload_changed(&self, added: usize, removed: usize, _key_count: usize, _elapsed: Duration) {
        self.push(Event::ReloadChanged { added, removed });
    }

    fn reload_unchanged(&self, _elapsed: Duration) {
        self.push(Event::ReloadUnchanged);
    }

    fn reload_failed(&self, _error: &SecretsError) {
        self.push(Event::ReloadFailed);
    }

    fn polling_started(&self, _interval: Duration) {
        self.push(Event::PollingStarted);
    }

    fn polling_stopped(&self) {
        self.push(Event::PollingStopped);
    }

    fn polling_error(&self, error: &SecretsError, _interval: Duration) {
        self.push(Event::PollingError(error.to_string()));
    }

    fn secret_skipped(&self, secret: &SecretDescriptor, reason: SkipReason) {
        self.push(Event::Skipped { name: secret.name.clone(), reason });
    }
}

/// Store preloaded with text secrets, in order.
pub async fn seeded_store(secrets: &[(&str, &str)]) -> InMemorySecretsManager {
    let store = InMemorySecretsManager::new();
    for (name, value) in secrets {
        store.put_text(name, *value).await;
    }
    store
}

/// Provider over `store` reporting to `observer`.
pub fn provider_with(
    store: &InMemorySecretsManager,
    options: ProviderOptions,
    observer: Option<Arc<RecordingObserver>>,
) -> SecretsManagerConfigurationProvider {
    let observer = observer.map(|o| o as Arc<dyn ReloadObserver>);
    SecretsManagerConfigurationProvider::new(Arc::new(store.clone()), options, observer)
}
