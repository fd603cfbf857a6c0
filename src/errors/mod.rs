//! # Error Handling
//!
//! Error taxonomy for loading configuration from a secrets manager. Every
//! fetch, parse, and reload failure is a [`SecretsError`]; a failed reload never
//! replaces the published snapshot.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while fetching secrets or building configuration.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// A requested secret does not exist and missing values are not ignored.
    #[error("Error retrieving secret value (Secret: {name} Arn: {arn})")]
    MissingSecretValue {
        name: String,
        arn: String,
        #[source]
        source: Option<Box<SecretsError>>,
    },

    /// One or more inline errors were reported by a batch retrieval.
    #[error("Batch secret retrieval failed with {} error(s)", errors.len())]
    BatchFailure { errors: Vec<SecretsError> },

    /// A structured payload contains a node that cannot become a configuration value.
    #[error("Unsupported JSON token at '{path}'")]
    Format { path: String },

    /// The secret could not be decrypted by the service.
    #[error("Decryption failure for secret '{secret_id}': {message}")]
    DecryptionFailure { secret_id: String, message: String },

    /// The service reported an internal error.
    #[error("Internal service error for secret '{secret_id}': {message}")]
    InternalServiceError { secret_id: String, message: String },

    /// A request parameter was rejected.
    #[error("Invalid parameter for secret '{secret_id}': {message}")]
    InvalidParameter { secret_id: String, message: String },

    /// The request is not valid for the current state of the secret.
    #[error("Invalid request for secret '{secret_id}': {message}")]
    InvalidRequest { secret_id: String, message: String },

    /// The store has no secret with this identifier.
    #[error("Secret not found: {secret_id}")]
    NotFound { secret_id: String, message: String },

    /// Any other error code returned by the service.
    #[error("Service error ({code}): {message}")]
    Service { code: String, message: String, secret_id: Option<String> },

    /// The request never produced a service response.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The operation observed its cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid provider settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(secret_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound { secret_id: secret_id.into(), message: message.into() }
    }

    /// Create a missing secret value error wrapping the store fault.
    pub fn missing_value(
        name: impl Into<String>,
        arn: impl Into<String>,
        source: Option<SecretsError>,
    ) -> Self {
        Self::MissingSecretValue { name: name.into(), arn: arn.into(), source: source.map(Box::new) }
    }

    /// Create a generic service error.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service { code: code.into(), message: message.into(), secret_id: None }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Map an inline batch error code onto a typed error.
    pub fn from_error_code(
        code: &str,
        secret_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let secret_id = secret_id.into();
        let message = message.into();
        match code {
            "DecryptionFailure" => Self::DecryptionFailure { secret_id, message },
            "InternalServiceError" => Self::InternalServiceError { secret_id, message },
            "InvalidParameterException" => Self::InvalidParameter { secret_id, message },
            "InvalidRequestException" => Self::InvalidRequest { secret_id, message },
            "ResourceNotFoundException" => Self::MissingSecretValue {
                name: secret_id.clone(),
                arn: secret_id.clone(),
                source: Some(Box::new(Self::NotFound { secret_id, message })),
            },
            _ => Self::Service { code: code.to_string(), message, secret_id: Some(secret_id) },
        }
    }

    /// True for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for a secret reported missing by the store.
    pub fn is_missing_value(&self) -> bool {
        matches!(self, Self::MissingSecretValue { .. })
    }

    /// True for the store's not found fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<validator::ValidationErrors> for SecretsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}

impl From<toml::de::Error> for SecretsError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config(format!("Invalid settings file: {}", error))
    }
}
