//! Secret value retrieval, one call per secret or in batches.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{with_cancellation, Notifier};
use crate::config::ProviderOptions;
use crate::errors::{Result, SecretsError};
use crate::observability::SkipReason;
use crate::secrets::{
    BatchGetSecretValueRequest, GetSecretValueRequest, RetrievedSecret, SecretContent,
    SecretDescriptor, SecretValueResponse, SecretsManagerClient,
};

/// Maximum number of identifiers per batch request.
pub const BATCH_CHUNK_SIZE: usize = 20;

/// Fetches the text payload of every accepted candidate.
///
/// Secrets with binary or absent payloads, and missing secrets when
/// `ignore_missing_values` is set, are left out and reported to the observer.
pub struct SecretRetriever {
    client: Arc<dyn SecretsManagerClient>,
    options: Arc<ProviderOptions>,
    notifier: Notifier,
}

impl SecretRetriever {
    pub(crate) fn new(
        client: Arc<dyn SecretsManagerClient>,
        options: Arc<ProviderOptions>,
        notifier: Notifier,
    ) -> Self {
        Self { client, options, notifier }
    }

    /// Retrieve values for `candidates` with the configured strategy.
    pub async fn retrieve(
        &self,
        candidates: Vec<SecretDescriptor>,
        token: &CancellationToken,
    ) -> Result<Vec<RetrievedSecret>> {
        let accepted = self.accepted(candidates);
        if self.options.use_batch_fetch {
            self.retrieve_batched(&accepted, token).await
        } else {
            self.retrieve_each(accepted, token).await
        }
    }

    // Allow-listed identifiers were chosen explicitly and bypass the predicate.
    fn accepted(&self, candidates: Vec<SecretDescriptor>) -> Vec<SecretDescriptor> {
        if self.options.uses_allow_list() {
            return candidates;
        }
        candidates.into_iter().filter(|candidate| (self.options.secret_filter)(candidate)).collect()
    }

    /// In allow-list mode the real name and creation date come from the store.
    fn refine(&self, descriptor: &SecretDescriptor, response: &SecretValueResponse) -> SecretDescriptor {
        if !self.options.uses_allow_list() {
            return descriptor.clone();
        }
        SecretDescriptor {
            id: descriptor.id.clone(),
            name: response.name.clone().unwrap_or_else(|| descriptor.name.clone()),
            created_at: response.created_at.or(descriptor.created_at),
        }
    }

    fn collect_text(
        &self,
        descriptor: SecretDescriptor,
        content: SecretContent,
        retrieved: &mut Vec<RetrievedSecret>,
    ) {
        match content {
            SecretContent::Text(text) => retrieved.push(RetrievedSecret { descriptor, text }),
            SecretContent::Binary(_) | SecretContent::Absent => {
                self.notifier.emit(|o| o.secret_skipped(&descriptor, SkipReason::NonText));
            }
        }
    }

    async fn retrieve_each(
        &self,
        candidates: Vec<SecretDescriptor>,
        token: &CancellationToken,
    ) -> Result<Vec<RetrievedSecret>> {
        let mut retrieved = Vec::with_capacity(candidates.len());

        for descriptor in candidates {
            let mut request = GetSecretValueRequest::new(descriptor.id.as_str());
            if let Some(configure) = &self.options.configure_secret_value_request {
                configure(&mut request, &descriptor);
            }

            let response = match with_cancellation(token, self.client.get_secret_value(request)).await
            {
                Ok(response) => response,
                Err(err) if err.is_not_found() && self.options.ignore_missing_values => {
                    self.notifier.emit(|o| o.secret_skipped(&descriptor, SkipReason::Missing));
                    continue;
                }
                Err(err) if err.is_not_found() => {
                    return Err(SecretsError::missing_value(
                        descriptor.name.as_str(),
                        descriptor.id.as_str(),
                        Some(err),
                    ));
                }
                Err(err) => return Err(err),
            };

            let descriptor = self.refine(&descriptor, &response);
            self.collect_text(descriptor, response.content, &mut retrieved);
        }

        Ok(retrieved)
    }

    async fn retrieve_batched(
        &self,
        candidates: &[SecretDescriptor],
        token: &CancellationToken,
    ) -> Result<Vec<RetrievedSecret>> {
        let mut retrieved = Vec::with_capacity(candidates.len());

        for chunk in candidates.chunks(BATCH_CHUNK_SIZE) {
            let values = self.fetch_chunk(chunk, token).await?;

            // Inner join on identifier; values with no matching candidate are dropped.
            for value in values {
                let Some(descriptor) = chunk.iter().find(|candidate| {
                    value.arn.as_deref() == Some(candidate.id.as_str())
                        || value.name.as_deref() == Some(candidate.id.as_str())
                }) else {
                    continue;
                };
                let descriptor = self.refine(descriptor, &value);
                self.collect_text(descriptor, value.content, &mut retrieved);
            }
        }

        Ok(retrieved)
    }

    async fn fetch_chunk(
        &self,
        chunk: &[SecretDescriptor],
        token: &CancellationToken,
    ) -> Result<Vec<SecretValueResponse>> {
        let mut request = BatchGetSecretValueRequest {
            secret_ids: chunk.iter().map(|d| d.id.clone()).collect(),
            next_token: None,
        };
        if let Some(configure) = &self.options.configure_batch_secret_value_request {
            configure(&mut request, chunk);
        }

        let mut values = Vec::new();
        loop {
            let response =
                match with_cancellation(token, self.client.batch_get_secret_value(request.clone()))
                    .await
                {
                    Ok(response) => response,
                    Err(err) if err.is_not_found() => {
                        return Err(SecretsError::missing_value(
                            join(chunk.iter().map(|d| d.name.as_str())),
                            join(chunk.iter().map(|d| d.id.as_str())),
                            Some(err),
                        ));
                    }
                    Err(err) => return Err(err),
                };

            if !response.errors.is_empty() {
                let errors: Vec<SecretsError> = response
                    .errors
                    .iter()
                    .map(|e| SecretsError::from_error_code(&e.error_code, &e.secret_id, &e.message))
                    .collect();

                if !self.options.ignore_missing_values || errors.iter().any(|e| !e.is_missing_value())
                {
                    return Err(SecretsError::BatchFailure { errors });
                }

                for entry in &response.errors {
                    let descriptor = chunk
                        .iter()
                        .find(|d| d.id == entry.secret_id)
                        .cloned()
                        .unwrap_or_else(|| SecretDescriptor::from_identifier(entry.secret_id.as_str()));
                    self.notifier.emit(|o| o.secret_skipped(&descriptor, SkipReason::Missing));
                }
            }

            values.extend(response.values);

            match response.next_token {
                Some(next) if !next.trim().is_empty() => request.next_token = Some(next),
                _ => break,
            }
        }

        Ok(values)
    }
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::ReloadObserver;
    use crate::secrets::{arn_for, InMemorySecretsManager};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        skipped: Mutex<Vec<(String, SkipReason)>>,
    }

    impl ReloadObserver for RecordingObserver {
        fn secret_skipped(&self, secret: &SecretDescriptor, reason: SkipReason) {
            self.skipped.lock().unwrap().push((secret.name.clone(), reason));
        }
    }

    fn retriever(
        store: &InMemorySecretsManager,
        options: ProviderOptions,
        observer: Option<Arc<RecordingObserver>>,
    ) -> SecretRetriever {
        let notifier = Notifier::new(observer.map(|o| o as Arc<dyn ReloadObserver>));
        SecretRetriever::new(Arc::new(store.clone()), Arc::new(options), notifier)
    }

    fn listed(name: &str) -> SecretDescriptor {
        SecretDescriptor::new(arn_for(name), name)
    }

    fn names(retrieved: &[RetrievedSecret]) -> Vec<&str> {
        retrieved.iter().map(|r| r.descriptor.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_single_skips_binary_and_reports() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "{}").await;
        store.put_binary("cert", vec![0, 1, 2]).await;
        let observer = Arc::new(RecordingObserver::default());

        let retrieved = retriever(&store, ProviderOptions::default(), Some(observer.clone()))
            .retrieve(vec![listed("db"), listed("cert")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(names(&retrieved), vec!["db"]);
        assert_eq!(*observer.skipped.lock().unwrap(), vec![("cert".to_string(), SkipReason::NonText)]);
    }

    #[tokio::test]
    async fn test_single_predicate_prevents_fetch() {
        let store = InMemorySecretsManager::new();
        store.put_text("keep", "1").await;
        store.put_text("drop", "2").await;
        let options = ProviderOptions::default().with_secret_filter(|s| s.name != "drop");

        let retrieved = retriever(&store, options, None)
            .retrieve(vec![listed("keep"), listed("drop")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(names(&retrieved), vec!["keep"]);
        let requests = store.get_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].secret_id, arn_for("keep"));
    }

    #[tokio::test]
    async fn test_single_missing_fails_unless_ignored() {
        let store = InMemorySecretsManager::new();
        store.put_text("present", "1").await;
        let candidates = vec![listed("gone"), listed("present")];

        let err = retriever(&store, ProviderOptions::default(), None)
            .retrieve(candidates.clone(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            SecretsError::MissingSecretValue { name, arn, source } => {
                assert_eq!(name, "gone");
                assert_eq!(arn, arn_for("gone"));
                assert!(source.is_some_and(|s| s.is_not_found()));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let observer = Arc::new(RecordingObserver::default());
        let options = ProviderOptions::default().with_ignore_missing_values(true);
        let retrieved = retriever(&store, options, Some(observer.clone()))
            .retrieve(candidates, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(names(&retrieved), vec!["present"]);
        assert_eq!(*observer.skipped.lock().unwrap(), vec![("gone".to_string(), SkipReason::Missing)]);
    }

    #[tokio::test]
    async fn test_single_other_faults_propagate() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "1").await;
        store.fail_with("db", "DecryptionFailure", "kms key disabled").await;
        let options = ProviderOptions::default().with_ignore_missing_values(true);

        let err = retriever(&store, options, None)
            .retrieve(vec![listed("db")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::DecryptionFailure { .. }));
    }

    #[tokio::test]
    async fn test_single_request_hook_applies() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "1").await;
        let options = ProviderOptions::default().with_secret_value_request(|request, secret| {
            request.version_stage = Some(format!("stage-{}", secret.name));
        });

        retriever(&store, options, None)
            .retrieve(vec![listed("db")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.get_requests().await[0].version_stage.as_deref(), Some("stage-db"));
    }

    #[tokio::test]
    async fn test_allow_list_refines_descriptor_and_bypasses_predicate() {
        let store = InMemorySecretsManager::new();
        store.put_text("db", "1").await;
        let options = ProviderOptions::default()
            .with_accepted_secret_arns([arn_for("db")])
            .with_secret_filter(|_| false);

        for batch in [false, true] {
            let retrieved = retriever(&store, options.clone().with_batch_fetch(batch), None)
                .retrieve(vec![SecretDescriptor::from_identifier(arn_for("db"))], &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(retrieved.len(), 1);
            assert_eq!(retrieved[0].descriptor.id, arn_for("db"));
            assert_eq!(retrieved[0].descriptor.name, "db");
            assert!(retrieved[0].descriptor.created_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_batch_chunks_by_twenty() {
        let store = InMemorySecretsManager::new();
        let mut candidates = Vec::new();
        for i in 0..45 {
            let name = format!("s{:02}", i);
            store.put_text(&name, i.to_string()).await;
            candidates.push(listed(&name));
        }
        let options = ProviderOptions::default().with_batch_fetch(true);

        let retrieved = retriever(&store, options, None)
            .retrieve(candidates, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(retrieved.len(), 45);
        let sizes: Vec<usize> =
            store.batch_requests().await.iter().map(|r| r.secret_ids.len()).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert!(store.get_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_follows_result_pages() {
        let store = InMemorySecretsManager::new().with_batch_page_size(2);
        let mut candidates = Vec::new();
        for name in ["a", "b", "c", "d", "e"] {
            store.put_text(name, name).await;
            candidates.push(listed(name));
        }
        let options = ProviderOptions::default().with_batch_fetch(true);

        let retrieved = retriever(&store, options, None)
            .retrieve(candidates, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(names(&retrieved), vec!["a", "b", "c", "d", "e"]);
        let requests = store.batch_requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].next_token.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_batch_missing_ignored_or_fails() {
        let store = InMemorySecretsManager::new();
        store.put_text("a", "1").await;
        let candidates = vec![listed("a"), listed("missing")];

        let observer = Arc::new(RecordingObserver::default());
        let options = ProviderOptions::default().with_batch_fetch(true).with_ignore_missing_values(true);
        let retrieved = retriever(&store, options, Some(observer.clone()))
            .retrieve(candidates.clone(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(names(&retrieved), vec!["a"]);
        assert_eq!(observer.skipped.lock().unwrap().len(), 1);

        let options = ProviderOptions::default().with_batch_fetch(true);
        let err = retriever(&store, options, None)
            .retrieve(candidates, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            SecretsError::BatchFailure { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].is_missing_value());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_non_missing_error_always_fails() {
        let store = InMemorySecretsManager::new();
        store.put_text("a", "1").await;
        store.put_text("b", "2").await;
        store.fail_with("b", "InternalServiceError", "boom").await;
        let options = ProviderOptions::default().with_batch_fetch(true).with_ignore_missing_values(true);

        let err = retriever(&store, options, None)
            .retrieve(vec![listed("a"), listed("b"), listed("gone")], &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            SecretsError::BatchFailure { errors } => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], SecretsError::InternalServiceError { .. }));
                assert!(errors[1].is_missing_value());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_hook_sees_chunk() {
        let store = InMemorySecretsManager::new();
        store.put_text("a", "1").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let options = ProviderOptions::default().with_batch_fetch(true).with_batch_secret_value_request(
            move |request, secrets| {
                recorder.lock().unwrap().push((request.secret_ids.len(), secrets.len()));
            },
        );

        retriever(&store, options, None)
            .retrieve(vec![listed("a")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_batch_skips_predicate_rejects_before_chunking() {
        let store = InMemorySecretsManager::new();
        store.put_text("a", "1").await;
        store.put_text("b", "2").await;
        let options =
            ProviderOptions::default().with_batch_fetch(true).with_secret_filter(|s| s.name == "b");

        let retrieved = retriever(&store, options, None)
            .retrieve(vec![listed("a"), listed("b")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(names(&retrieved), vec!["b"]);
        assert_eq!(store.batch_requests().await[0].secret_ids, vec![arn_for("b")]);
    }

    #[tokio::test]
    async fn test_empty_candidates_make_no_calls() {
        let store = InMemorySecretsManager::new();
        let options = ProviderOptions::default().with_batch_fetch(true);
        let retrieved = retriever(&store, options, None)
            .retrieve(Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(retrieved.is_empty());
        assert!(store.batch_requests().await.is_empty());
    }
}
