//! Immutable configuration snapshots.

use std::collections::HashMap;
use std::fmt;

use super::flatten::flatten;
use super::payload::SecretPayload;
use crate::config::KeyGenerator;
use crate::errors::Result;
use crate::secrets::RetrievedSecret;

/// Case-insensitive key/value view of the store at one point in time.
///
/// Keys compare after Unicode lowercasing; the casing of the last inserted key
/// is kept for iteration. Two snapshots are equal when they hold exactly the
/// same `(key, value)` pairs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<String, (String, String)>,
}

/// Pair-level difference between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: usize,
    pub removed: usize,
}

fn normalize(key: &str) -> String {
    key.to_lowercase()
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair. A key equal to an existing one after normalization
    /// replaces it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.entries.insert(normalize(&key), (key, value.into()));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs in arbitrary order, with keys in their stored casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(key, _)| key.as_str())
    }

    /// Count pairs present only in `self` (added) and only in `previous` (removed).
    pub fn diff(&self, previous: &Snapshot) -> SnapshotDiff {
        let only_in = |a: &Snapshot, b: &Snapshot| {
            a.entries.iter().filter(|(norm, pair)| b.entries.get(*norm) != Some(*pair)).count()
        };
        SnapshotDiff { added: only_in(self, previous), removed: only_in(previous, self) }
    }
}

// Values are secrets; only keys are printed.
impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Snapshot").field("keys", &keys).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        snapshot.extend(iter);
        snapshot
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Snapshot {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Turns retrieved secrets into a [`Snapshot`].
///
/// Structured payloads contribute one key per JSON leaf, prefixed with the
/// secret name. Anything else is stored verbatim under the secret name. Every
/// key passes through the configured key generator.
pub struct SnapshotBuilder {
    key_generator: KeyGenerator,
}

impl SnapshotBuilder {
    pub fn new(key_generator: KeyGenerator) -> Self {
        Self { key_generator }
    }

    pub fn build(&self, secrets: &[RetrievedSecret]) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        for secret in secrets {
            let descriptor = &secret.descriptor;
            let raw = secret.text.expose_secret();

            match SecretPayload::parse(raw) {
                SecretPayload::Structured(value) => {
                    for pair in flatten(&value, &descriptor.name) {
                        let (path, leaf) = pair?;
                        snapshot.insert((self.key_generator)(descriptor, &path), leaf);
                    }
                }
                SecretPayload::Opaque => {
                    snapshot.insert((self.key_generator)(descriptor, &descriptor.name), raw);
                }
            }
        }

        Ok(snapshot)
    }
}
