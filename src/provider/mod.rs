//! External token provider.
//!
//! The rotation workflow consumes exactly two provider operations: minting a
//! new long-lived token from the current one, and checking that a token is
//! accepted by the live API. Both are single HTTP calls; non-2xx responses are
//! failures and nothing is retried here. Retry policy belongs to the rotation
//! coordinator.

pub mod graph;
pub mod stub;

pub use graph::{GrantKind, GraphTokenProvider, GraphTokenProviderConfig, RefreshGrant};
pub use stub::StubTokenProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::secrets::SecretString;
use crate::utils::HttpFailure;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A token minted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalToken {
    pub access_token: SecretString,
    /// Remaining validity in seconds, when the provider reports it.
    pub expires_in: Option<u64>,
}

impl ExternalToken {
    pub fn new(access_token: impl Into<SecretString>, expires_in: Option<u64>) -> Self {
        Self { access_token: access_token.into(), expires_in }
    }
}

/// Errors returned by a [`TokenProvider`].
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("{operation} request failed: {message}")]
    Transport { operation: &'static str, message: String },

    /// The provider answered with a non-2xx status.
    #[error("{operation} returned {status}: {body}")]
    Status { operation: &'static str, status: u16, body: String },

    /// The response was 2xx but unusable (bad JSON, missing field).
    #[error("{operation} returned an invalid response: {reason}")]
    InvalidResponse { operation: &'static str, reason: String },

    /// The provider was constructed with unusable settings.
    #[error("Provider configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn invalid_response(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse { operation, reason: reason.into() }
    }

    pub(crate) fn from_http(operation: &'static str, failure: HttpFailure) -> Self {
        match failure {
            HttpFailure::Transport(message) => Self::Transport { operation, message },
            HttpFailure::Status { status, body } => {
                Self::Status { operation, status: status.as_u16(), body }
            }
            HttpFailure::Decode(reason) => Self::InvalidResponse { operation, reason },
        }
    }

    /// HTTP status of the failed call, if the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Capability interface over the external API that owns the credential.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Exchange the current token for a new long-lived token.
    async fn refresh(&self, current: &SecretString) -> Result<ExternalToken>;

    /// Confirm the token is accepted; returns the subject (user) id.
    ///
    /// A response without a non-empty subject id is a failure.
    async fn validate(&self, token: &SecretString) -> Result<String>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_http_maps_status() {
        let err = ProviderError::from_http(
            "refresh",
            HttpFailure::Status { status: StatusCode::UNAUTHORIZED, body: "expired".into() },
        );
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "refresh returned 401: expired");
    }

    #[test]
    fn test_from_http_maps_decode() {
        let err = ProviderError::from_http("validate", HttpFailure::Decode("eof".into()));
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
        assert_eq!(err.status(), None);
    }
}
