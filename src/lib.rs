//! # secretsmanager-config
//!
//! A configuration provider that materializes a flat, case-insensitive
//! key/value view of a remote secrets manager and keeps it fresh by polling.
//!
//! ## Architecture
//!
//! ```text
//! Polling / force_reload → ReloadEngine → SecretCatalog → SecretRetriever
//!                               ↑                              ↓
//!                     publish + notify  ← SnapshotBuilder ← flatten(JSON)
//! ```
//!
//! ## Core Components
//!
//! - **Provider**: [`SecretsManagerConfigurationProvider`] with load, subscribe,
//!   force reload, and shutdown
//! - **Secrets**: the [`SecretsManagerClient`] boundary, an in-memory store,
//!   and an AWS SDK client behind the `aws` feature
//! - **Config**: [`ProviderOptions`] and env/TOML backed [`ProviderSettings`]
//! - **Observability**: the [`ReloadObserver`] sink with a tracing and metrics
//!   implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use secretsmanager_config::{
//!     InMemorySecretsManager, ProviderSettings, Result, SecretsManagerConfigurationProvider,
//!     TracingObserver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = ProviderSettings::from_env()?;
//!     secretsmanager_config::observability::init_logging(&settings.logging)?;
//!
//!     let store = InMemorySecretsManager::new();
//!     store.put_text("db", r#"{"host":"localhost","port":5432}"#).await;
//!
//!     let provider = SecretsManagerConfigurationProvider::new(
//!         Arc::new(store),
//!         settings.into_options(),
//!         Some(Arc::new(TracingObserver::new())),
//!     );
//!     provider.load().await?;
//!     assert_eq!(provider.get("db:port").as_deref(), Some("5432"));
//!
//!     provider.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::{ProviderOptions, ProviderSettings};
pub use errors::{Result, SecretsError};
pub use observability::{ReloadObserver, TracingObserver};
pub use provider::{ChangeToken, ReloadOutcome, SecretsManagerConfigurationProvider, Snapshot};
pub use secrets::{InMemorySecretsManager, SecretDescriptor, SecretsManagerClient};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
