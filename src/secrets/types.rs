//! Secret identities and payloads as the store hands them back.
//!
//! Raw secret text travels as [`SecretString`], which redacts itself in
//! `Debug`/`Display` output and zeroes its memory on drop. It is only exposed
//! when the snapshot builder turns it into configuration values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifies one secret in the remote store.
///
/// `id` is the ARN when the secret came from a listing call, or the caller's
/// identifier (ARN or name) in allow-list mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretDescriptor {
    /// Identifier used for retrieval
    pub id: String,

    /// Display name, used as the flattening prefix
    pub name: String,

    /// When the secret was created, if the store reported it
    pub created_at: Option<DateTime<Utc>>,
}

impl SecretDescriptor {
    /// Create a descriptor without a creation timestamp.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), created_at: None }
    }

    /// Descriptor for an allow-listed identifier: the identifier doubles as the name.
    pub fn from_identifier(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self { name: identifier.clone(), id: identifier, created_at: None }
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A secret string that never prints its contents.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Length in bytes without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Payload of one secret version.
///
/// Only [`SecretContent::Text`] can contribute configuration keys; binary and
/// absent payloads are always dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecretContent {
    /// `SecretString` payload
    Text(SecretString),
    /// `SecretBinary` payload
    Binary(Vec<u8>),
    /// Neither payload was returned
    #[default]
    Absent,
}

impl SecretContent {
    /// Text payload, if any.
    pub fn text(&self) -> Option<&SecretString> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) | Self::Absent => None,
        }
    }
}

/// One secret's descriptor together with its textual payload.
///
/// This is what the retrievers hand to the snapshot builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedSecret {
    pub descriptor: SecretDescriptor,
    pub text: SecretString,
}
