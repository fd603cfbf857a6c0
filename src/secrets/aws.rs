//! AWS Secrets Manager client backed by the official SDK.
//!
//! Only compiled with the `aws` feature. Building the SDK client (credentials,
//! region, endpoint) stays with the caller; this adapter takes a ready
//! [`aws_sdk_secretsmanager::Client`] and maps its calls and errors onto
//! [`SecretsManagerClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! let sdk_config = aws_config::load_from_env().await;
//! let client = AwsSecretsManagerClient::new(aws_sdk_secretsmanager::Client::new(&sdk_config));
//! ```

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_secretsmanager::primitives::DateTime as AwsDateTime;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use aws_sdk_secretsmanager::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::client::{
    BatchErrorEntry, BatchGetSecretValueRequest, BatchGetSecretValueResponse,
    GetSecretValueRequest, ListSecretsPage, ListSecretsRequest, SecretValueResponse,
    SecretsManagerClient,
};
use super::types::{SecretContent, SecretDescriptor, SecretString};
use crate::errors::{Result, SecretsError};

/// [`SecretsManagerClient`] over the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerClient {
    client: Client,
}

impl AwsSecretsManagerClient {
    /// Wrap an SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_chrono(value: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
}

fn content_of(text: Option<&str>, binary: Option<&[u8]>) -> SecretContent {
    match (text, binary) {
        (Some(text), _) => SecretContent::Text(SecretString::new(text)),
        (None, Some(bytes)) => SecretContent::Binary(bytes.to_vec()),
        (None, None) => SecretContent::Absent,
    }
}

fn service_error<E>(error: &E, secret_id: Option<&str>) -> SecretsError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = error.message().map(str::to_string).unwrap_or_else(|| error.to_string());
    match (error.code(), secret_id) {
        (Some("ResourceNotFoundException"), Some(id)) => SecretsError::not_found(id, message),
        (Some(code), Some(id)) => SecretsError::from_error_code(code, id, message),
        (Some(code), None) => SecretsError::service(code, message),
        (None, _) => SecretsError::transport(format!("{}", DisplayErrorContext(error))),
    }
}

#[async_trait]
impl SecretsManagerClient for AwsSecretsManagerClient {
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<ListSecretsPage> {
        let filters: Vec<Filter> = request
            .filters
            .iter()
            .map(|f| {
                Filter::builder()
                    .key(FilterNameStringType::from(f.key.as_str()))
                    .set_values(Some(f.values.clone()))
                    .build()
            })
            .collect();

        debug!(filters = filters.len(), has_token = request.next_token.is_some(), "Listing secrets");

        let output = self
            .client
            .list_secrets()
            .set_filters((!filters.is_empty()).then_some(filters))
            .set_next_token(request.next_token)
            .send()
            .await
            .map_err(|e| service_error(&e.into_service_error(), None))?;

        let secrets = output
            .secret_list()
            .iter()
            .map(|entry| SecretDescriptor {
                id: entry.arn().unwrap_or_default().to_string(),
                name: entry.name().unwrap_or_default().to_string(),
                created_at: to_chrono(entry.created_date()),
            })
            .collect();

        Ok(ListSecretsPage { secrets, next_token: output.next_token().map(str::to_string) })
    }

    async fn get_secret_value(&self, request: GetSecretValueRequest) -> Result<SecretValueResponse> {
        debug!(secret_id = %request.secret_id, "Getting secret value");

        let output = self
            .client
            .get_secret_value()
            .secret_id(&request.secret_id)
            .set_version_id(request.version_id)
            .set_version_stage(request.version_stage)
            .send()
            .await
            .map_err(|e| service_error(&e.into_service_error(), Some(&request.secret_id)))?;

        Ok(SecretValueResponse {
            arn: output.arn().map(str::to_string),
            name: output.name().map(str::to_string),
            content: content_of(output.secret_string(), output.secret_binary().map(|b| b.as_ref())),
            created_at: to_chrono(output.created_date()),
        })
    }

    async fn batch_get_secret_value(
        &self,
        request: BatchGetSecretValueRequest,
    ) -> Result<BatchGetSecretValueResponse> {
        debug!(count = request.secret_ids.len(), "Batch getting secret values");

        let output = self
            .client
            .batch_get_secret_value()
            .set_secret_id_list(Some(request.secret_ids))
            .set_next_token(request.next_token)
            .send()
            .await
            .map_err(|e| {
                let error = e.into_service_error();
                match error.code() {
                    Some("ResourceNotFoundException") => SecretsError::not_found(
                        "",
                        error.message().unwrap_or("Secret not found").to_string(),
                    ),
                    _ => service_error(&error, None),
                }
            })?;

        let values = output
            .secret_values()
            .iter()
            .map(|entry| SecretValueResponse {
                arn: entry.arn().map(str::to_string),
                name: entry.name().map(str::to_string),
                content: content_of(entry.secret_string(), entry.secret_binary().map(|b| b.as_ref())),
                created_at: to_chrono(entry.created_date()),
            })
            .collect();

        let errors = output
            .errors()
            .iter()
            .map(|e| BatchErrorEntry {
                secret_id: e.secret_id().unwrap_or_default().to_string(),
                error_code: e.error_code().unwrap_or_default().to_string(),
                message: e.message().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(BatchGetSecretValueResponse {
            values,
            errors,
            next_token: output.next_token().map(str::to_string),
        })
    }
}
