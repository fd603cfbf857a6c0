//! Remote secret store contract and its request/response types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{SecretContent, SecretDescriptor};
use crate::errors::Result;

/// Server-side listing filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKey {
    Description,
    Name,
    TagKey,
    TagValue,
    PrimaryRegion,
    OwningService,
    All,
}

impl FilterKey {
    /// Wire representation of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Name => "name",
            Self::TagKey => "tag-key",
            Self::TagValue => "tag-value",
            Self::PrimaryRegion => "primary-region",
            Self::OwningService => "owning-service",
            Self::All => "all",
        }
    }
}

/// A server-side filter passed to `list_secrets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSecretsFilter {
    pub key: FilterKey,
    pub values: Vec<String>,
}

impl ListSecretsFilter {
    /// Create a filter for one key.
    pub fn new<I, S>(key: FilterKey, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { key, values: values.into_iter().map(Into::into).collect() }
    }
}

/// One page request of the secret listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsRequest {
    pub filters: Vec<ListSecretsFilter>,
    pub next_token: Option<String>,
}

/// One page of the secret listing.
#[derive(Debug, Clone, Default)]
pub struct ListSecretsPage {
    pub secrets: Vec<SecretDescriptor>,
    pub next_token: Option<String>,
}

/// Request for the current value of one secret.
///
/// `version_id` and `version_stage` are normally left empty and set through the
/// request customization hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetSecretValueRequest {
    pub secret_id: String,
    pub version_id: Option<String>,
    pub version_stage: Option<String>,
}

impl GetSecretValueRequest {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self { secret_id: secret_id.into(), ..Default::default() }
    }
}

/// A secret value returned by the store.
#[derive(Debug, Clone, Default)]
pub struct SecretValueResponse {
    pub arn: Option<String>,
    pub name: Option<String>,
    pub content: SecretContent,
    pub created_at: Option<DateTime<Utc>>,
}

/// Batched value request for up to one chunk of identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchGetSecretValueRequest {
    pub secret_ids: Vec<String>,
    pub next_token: Option<String>,
}

/// A per-item failure reported inside a successful batch response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchErrorEntry {
    pub secret_id: String,
    pub error_code: String,
    pub message: String,
}

/// One page of a batched value response.
#[derive(Debug, Clone, Default)]
pub struct BatchGetSecretValueResponse {
    pub values: Vec<SecretValueResponse>,
    pub errors: Vec<BatchErrorEntry>,
    pub next_token: Option<String>,
}

/// Network boundary to the remote secret store.
///
/// The provider never talks to the network itself; every concrete transport
/// implements this trait, and tests substitute
/// [`InMemorySecretsManager`](super::memory::InMemorySecretsManager).
///
/// # Errors
///
/// Implementations report a missing secret as [`SecretsError::NotFound`] and map
/// every other service error code through [`SecretsError::from_error_code`] or
/// [`SecretsError::Service`]. Inline batch errors are returned in
/// [`BatchGetSecretValueResponse::errors`], never as `Err`.
///
/// [`SecretsError::NotFound`]: crate::errors::SecretsError::NotFound
/// [`SecretsError::from_error_code`]: crate::errors::SecretsError::from_error_code
/// [`SecretsError::Service`]: crate::errors::SecretsError::Service
#[async_trait]
pub trait SecretsManagerClient: Send + Sync {
    /// Fetch one page of the secret listing.
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<ListSecretsPage>;

    /// Fetch the value of one secret.
    async fn get_secret_value(&self, request: GetSecretValueRequest) -> Result<SecretValueResponse>;

    /// Fetch one page of values for a set of secrets.
    async fn batch_get_secret_value(
        &self,
        request: BatchGetSecretValueRequest,
    ) -> Result<BatchGetSecretValueResponse>;
}
