//! # Error Handling
//!
//! Crate-wide error type. Each subsystem owns a focused `thiserror` enum
//! ([`SecretsError`], [`ProviderError`], [`RotationError`], [`DigestError`]);
//! this module aggregates them so the entry points can propagate with `?`.

use crate::digest::DigestError;
use crate::provider::ProviderError;
use crate::rotation::RotationError;
use crate::secrets::SecretsError;

/// Custom result type for social-digest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for social-digest
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret store errors
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// External token provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Credential rotation errors
    #[error(transparent)]
    Rotation(#[from] RotationError),

    /// Insight-and-recommend workflow errors
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable kind for status output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Secrets(_) => "secrets",
            Self::Provider(_) => "provider",
            Self::Rotation(e) => e.kind(),
            Self::Digest(e) => e.stage(),
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(format!("Validation failed: {}", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("TO_EMAIL is required");
        assert_eq!(err.to_string(), "Configuration error: TO_EMAIL is required");
    }

    #[test]
    fn test_subsystem_errors_are_transparent() {
        let err: Error = RotationError::unknown_step("rotateEverything").into();
        assert!(err.to_string().contains("rotateEverything"));
        assert!(matches!(err, Error::Rotation(RotationError::UnknownStep { .. })));

        let err: Error = SecretsError::not_found("IG_TOKEN").into();
        assert_eq!(err.to_string(), "Secret not found: IG_TOKEN");
    }

    #[test]
    fn test_kind_delegates_to_subsystem() {
        let err: Error = RotationError::unknown_step("rotateEverything").into();
        assert_eq!(err.kind(), "unknown_step");

        let err: Error = DigestError::Delivery("relay refused".into()).into();
        assert_eq!(err.kind(), "email");
        assert_eq!(Error::config("x").kind(), "config");
    }
}
