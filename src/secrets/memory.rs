//! In-memory secret store for local development and tests.
//!
//! Behaves like the remote service where the provider can observe it:
//! paginated listing with `name`/`all` filters, not-found faults, inline batch
//! errors, paged batch results, and optional per-call latency. Every request is
//! recorded so callers can assert what was (and was not) asked for.
//!
//! # Example
//!
//! ```rust,ignore
//! use secretsmanager_config::secrets::InMemorySecretsManager;
//!
//! let store = InMemorySecretsManager::new();
//! store.put_text("db", r#"{"host":"h","port":5432}"#).await;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use super::client::{
    BatchErrorEntry, BatchGetSecretValueRequest, BatchGetSecretValueResponse, FilterKey,
    GetSecretValueRequest, ListSecretsFilter, ListSecretsPage, ListSecretsRequest,
    SecretValueResponse, SecretsManagerClient,
};
use super::types::{SecretContent, SecretDescriptor, SecretString};
use crate::errors::{Result, SecretsError};

const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

/// ARN the in-memory store assigns to a secret name.
pub fn arn_for(name: &str) -> String {
    format!("arn:aws:secretsmanager:us-east-1:000000000000:secret:{}", name)
}

#[derive(Debug, Clone)]
struct StoredSecret {
    descriptor: SecretDescriptor,
    content: SecretContent,
}

impl StoredSecret {
    fn matches(&self, identifier: &str) -> bool {
        self.descriptor.id == identifier || self.descriptor.name == identifier
    }

    fn to_response(&self) -> SecretValueResponse {
        SecretValueResponse {
            arn: Some(self.descriptor.id.clone()),
            name: Some(self.descriptor.name.clone()),
            content: self.content.clone(),
            created_at: self.descriptor.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct CallLog {
    list: Vec<ListSecretsRequest>,
    get: Vec<GetSecretValueRequest>,
    batch: Vec<BatchGetSecretValueRequest>,
}

/// Secret store held in process memory.
///
/// Clones share the same underlying data, so a test can keep one handle for
/// mutation while the provider owns another.
#[derive(Debug, Clone)]
pub struct InMemorySecretsManager {
    secrets: Arc<RwLock<Vec<StoredSecret>>>,
    failures: Arc<RwLock<HashMap<String, (String, String)>>>,
    calls: Arc<Mutex<CallLog>>,
    list_page_size: usize,
    batch_page_size: usize,
    latency: Option<Duration>,
}

impl Default for InMemorySecretsManager {
    fn default() -> Self {
        Self {
            secrets: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(Mutex::new(CallLog::default())),
            list_page_size: 100,
            batch_page_size: 20,
            latency: None,
        }
    }
}

impl InMemorySecretsManager {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of secrets per listing page.
    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size.max(1);
        self
    }

    /// Number of values per batch response page.
    pub fn with_batch_page_size(mut self, size: usize) -> Self {
        self.batch_page_size = size.max(1);
        self
    }

    /// Delay applied to every call before it answers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store or replace a secret with a text payload.
    pub async fn put_text(&self, name: &str, value: impl Into<String>) {
        self.put(name, SecretContent::Text(SecretString::new(value))).await;
    }

    /// Store or replace a secret with a binary payload.
    pub async fn put_binary(&self, name: &str, value: Vec<u8>) {
        self.put(name, SecretContent::Binary(value)).await;
    }

    /// Store or replace a secret with the given payload.
    pub async fn put(&self, name: &str, content: SecretContent) {
        let mut secrets = self.secrets.write().await;
        if let Some(existing) = secrets.iter_mut().find(|s| s.descriptor.name == name) {
            existing.content = content;
            return;
        }
        secrets.push(StoredSecret {
            descriptor: SecretDescriptor::new(arn_for(name), name).with_created_at(Utc::now()),
            content,
        });
    }

    /// Delete a secret. Returns `true` if it existed.
    pub async fn remove(&self, name: &str) -> bool {
        let mut secrets = self.secrets.write().await;
        let before = secrets.len();
        secrets.retain(|s| s.descriptor.name != name);
        secrets.len() != before
    }

    /// Make every retrieval of `name` fail with the given error code.
    ///
    /// Batch calls report it inline; single calls return it as a fault.
    pub async fn fail_with(&self, name: &str, code: &str, message: &str) {
        self.failures.write().await.insert(name.to_string(), (code.to_string(), message.to_string()));
    }

    /// Remove an injected failure.
    pub async fn clear_failure(&self, name: &str) {
        self.failures.write().await.remove(name);
    }

    /// Recorded listing requests.
    pub async fn list_requests(&self) -> Vec<ListSecretsRequest> {
        self.calls.lock().await.list.clone()
    }

    /// Recorded single value requests.
    pub async fn get_requests(&self) -> Vec<GetSecretValueRequest> {
        self.calls.lock().await.get.clone()
    }

    /// Recorded batch value requests.
    pub async fn batch_requests(&self) -> Vec<BatchGetSecretValueRequest> {
        self.calls.lock().await.batch.clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn injected_failure(&self, secret: &StoredSecret) -> Option<(String, String)> {
        self.failures.read().await.get(&secret.descriptor.name).cloned()
    }
}

fn parse_token(token: Option<&str>) -> Result<usize> {
    match token {
        None => Ok(0),
        Some(raw) => raw.parse().map_err(|_| {
            SecretsError::service("InvalidNextTokenException", format!("Invalid token: {}", raw))
        }),
    }
}

fn filter_matches(filter: &ListSecretsFilter, name: &str) -> Result<bool> {
    match filter.key {
        FilterKey::Name => Ok(filter.values.iter().any(|v| name.starts_with(v.as_str()))),
        FilterKey::All => Ok(filter.values.iter().any(|v| name.contains(v.as_str()))),
        other => Err(SecretsError::service(
            "InvalidParameterException",
            format!("Filter '{}' is not supported by the in-memory store", other.as_str()),
        )),
    }
}

#[async_trait]
impl SecretsManagerClient for InMemorySecretsManager {
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<ListSecretsPage> {
        self.calls.lock().await.list.push(request.clone());
        self.simulate_latency().await;

        let secrets = self.secrets.read().await;
        let mut matching = Vec::new();
        for secret in secrets.iter() {
            let mut keep = true;
            for filter in &request.filters {
                keep &= filter_matches(filter, &secret.descriptor.name)?;
            }
            if keep {
                matching.push(secret.descriptor.clone());
            }
        }

        let start = parse_token(request.next_token.as_deref())?;
        let end = (start + self.list_page_size).min(matching.len());
        let page = matching.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(ListSecretsPage { secrets: page, next_token })
    }

    async fn get_secret_value(&self, request: GetSecretValueRequest) -> Result<SecretValueResponse> {
        self.calls.lock().await.get.push(request.clone());
        self.simulate_latency().await;

        let secrets = self.secrets.read().await;
        let secret = secrets.iter().find(|s| s.matches(&request.secret_id)).ok_or_else(|| {
            SecretsError::not_found(
                &request.secret_id,
                "Secrets Manager can't find the specified secret.",
            )
        })?;

        match self.injected_failure(secret).await {
            Some((code, message)) if code == NOT_FOUND_CODE => {
                Err(SecretsError::not_found(&request.secret_id, message))
            }
            Some((code, message)) => {
                Err(SecretsError::from_error_code(&code, &request.secret_id, message))
            }
            None => Ok(secret.to_response()),
        }
    }

    async fn batch_get_secret_value(
        &self,
        request: BatchGetSecretValueRequest,
    ) -> Result<BatchGetSecretValueResponse> {
        self.calls.lock().await.batch.push(request.clone());
        self.simulate_latency().await;

        if request.secret_ids.is_empty() {
            return Err(SecretsError::service(
                "InvalidParameterException",
                "SecretIdList must contain at least one identifier",
            ));
        }

        let secrets = self.secrets.read().await;
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for secret_id in &request.secret_ids {
            let Some(secret) = secrets.iter().find(|s| s.matches(secret_id)) else {
                errors.push(BatchErrorEntry {
                    secret_id: secret_id.clone(),
                    error_code: NOT_FOUND_CODE.to_string(),
                    message: "Secrets Manager can't find the specified secret.".to_string(),
                });
                continue;
            };
            match self.injected_failure(secret).await {
                Some((error_code, message)) => errors.push(BatchErrorEntry {
                    secret_id: secret_id.clone(),
                    error_code,
                    message,
                }),
                None => values.push(secret.to_response()),
            }
        }

        let start = parse_token(request.next_token.as_deref())?;
        let end = (start + self.batch_page_size).min(values.len());
        let page = values.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < values.len()).then(|| end.to_string());
        // Inline errors are reported once, on the first page.
        let errors = if start == 0 { errors } else { Vec::new() };

        Ok(BatchGetSecretValueResponse { values: page, errors, next_token })
    }
}
