//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur during secret store operations.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret (or a specific version of it) not found in the store.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// Failed to connect to the secret store.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// A different value was already written under the same version token.
    #[error("Version '{version_id}' of secret '{secret_id}' already holds a different value")]
    VersionConflict { secret_id: String, version_id: String },

    /// The backend does not support writes.
    #[error("Secret store is read-only: {message}")]
    ReadOnly { message: String },

    /// Secret value validation failed.
    #[error("Invalid secret value: {reason}")]
    InvalidValue { reason: String },

    /// Backend-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a version conflict error.
    pub fn version_conflict(secret_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self::VersionConflict { secret_id: secret_id.into(), version_id: version_id.into() }
    }

    /// Create a read-only error.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::ReadOnly { message: message.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue { reason: reason.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
