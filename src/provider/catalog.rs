//! Discovery of candidate secrets.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::with_cancellation;
use crate::config::ProviderOptions;
use crate::errors::Result;
use crate::secrets::{ListSecretsRequest, SecretDescriptor, SecretsManagerClient};

/// Produces the list of secrets a reload should fetch.
///
/// With an allow-list configured the identifiers are used as-is and the store
/// is never listed. Otherwise every page of the listing is fetched with the
/// configured server-side filters. The client-side predicate is not applied
/// here.
pub struct SecretCatalog {
    client: Arc<dyn SecretsManagerClient>,
    options: Arc<ProviderOptions>,
}

impl SecretCatalog {
    pub fn new(client: Arc<dyn SecretsManagerClient>, options: Arc<ProviderOptions>) -> Self {
        Self { client, options }
    }

    /// List candidate secrets in store order.
    pub async fn list_candidates(&self, token: &CancellationToken) -> Result<Vec<SecretDescriptor>> {
        if self.options.uses_allow_list() {
            return Ok(self
                .options
                .accepted_secret_arns
                .iter()
                .map(|arn| SecretDescriptor::from_identifier(arn.as_str()))
                .collect());
        }

        let mut candidates = Vec::new();
        let mut next_token = None;
        loop {
            let request = ListSecretsRequest {
                filters: self.options.list_secrets_filters.clone(),
                next_token,
            };
            let page = with_cancellation(token, self.client.list_secrets(request)).await?;
            candidates.extend(page.secrets);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{FilterKey, InMemorySecretsManager, ListSecretsFilter};

    async fn store_with(names: &[&str]) -> InMemorySecretsManager {
        let store = InMemorySecretsManager::new().with_list_page_size(2);
        for name in names {
            store.put_text(name, "value").await;
        }
        store
    }

    #[tokio::test]
    async fn test_lists_all_pages_in_order() {
        let store = store_with(&["a", "b", "c", "d", "e"]).await;
        let catalog = SecretCatalog::new(Arc::new(store.clone()), Arc::new(ProviderOptions::default()));

        let candidates = catalog.list_candidates(&CancellationToken::new()).await.unwrap();
        let names: Vec<&str> = candidates.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(store.list_requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_passes_server_side_filters() {
        let store = store_with(&["prod/db", "dev/db", "prod/api"]).await;
        let options = ProviderOptions::default()
            .with_list_filter(ListSecretsFilter::new(FilterKey::Name, ["prod/"]));
        let catalog = SecretCatalog::new(Arc::new(store.clone()), Arc::new(options));

        let candidates = catalog.list_candidates(&CancellationToken::new()).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|d| d.name.starts_with("prod/")));
        assert_eq!(store.list_requests().await[0].filters.len(), 1);
    }

    #[tokio::test]
    async fn test_allow_list_skips_listing() {
        let store = store_with(&["a"]).await;
        let options = ProviderOptions::default().with_accepted_secret_arns(["arn:x", "b"]);
        let catalog = SecretCatalog::new(Arc::new(store.clone()), Arc::new(options));

        let candidates = catalog.list_candidates(&CancellationToken::new()).await.unwrap();
        assert_eq!(candidates, vec![
            SecretDescriptor::from_identifier("arn:x"),
            SecretDescriptor::from_identifier("b"),
        ]);
        assert!(store.list_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_does_not_apply_predicate() {
        let store = store_with(&["a", "b"]).await;
        let options = ProviderOptions::default().with_secret_filter(|_| false);
        let catalog = SecretCatalog::new(Arc::new(store), Arc::new(options));

        let candidates = catalog.list_candidates(&CancellationToken::new()).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_listing() {
        let store = store_with(&["a"]).await;
        let catalog = SecretCatalog::new(Arc::new(store), Arc::new(ProviderOptions::default()));

        let token = CancellationToken::new();
        token.cancel();
        let err = catalog.list_candidates(&token).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
