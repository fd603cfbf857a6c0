//! Remote secret store access.
//!
//! The provider reaches the secret store only through the [`SecretsManagerClient`]
//! trait:
//! - **list_secrets**: paginated discovery with server-side filters
//! - **get_secret_value**: one secret at a time
//! - **batch_get_secret_value**: up to one chunk of secrets per call, with
//!   per-item errors reported inline
//!
//! # Supported Backends
//!
//! - **In-memory**: [`InMemorySecretsManager`] for development and tests
//! - **AWS Secrets Manager**: `AwsSecretsManagerClient` (feature `aws`)

#[cfg(feature = "aws")]
pub mod aws;
pub mod client;
pub mod memory;
pub mod types;

pub use client::{
    BatchErrorEntry, BatchGetSecretValueRequest, BatchGetSecretValueResponse, FilterKey,
    GetSecretValueRequest, ListSecretsFilter, ListSecretsPage, ListSecretsRequest,
    SecretValueResponse, SecretsManagerClient,
};
pub use memory::{arn_for, InMemorySecretsManager};
pub use types::{RetrievedSecret, SecretContent, SecretDescriptor, SecretString};

#[cfg(feature = "aws")]
pub use aws::AwsSecretsManagerClient;
