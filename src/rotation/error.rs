//! Rotation error taxonomy.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::secrets::SecretsError;

/// Result type for rotation steps.
pub type Result<T> = std::result::Result<T, RotationError>;

/// Errors raised by a rotation step.
///
/// Every variant aborts the step. Preconditions are fatal and must not be
/// retried; upstream and store failures are left to the coordinator.
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("Unknown rotation step '{step}'")]
    UnknownStep { step: String },

    #[error("Invalid rotation request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Version {version_id} is not registered for secret '{secret_id}'")]
    VersionNotFound { secret_id: String, version_id: String },

    #[error("Version {version_id} of secret '{secret_id}' is not labeled AWSPENDING")]
    VersionNotPending { secret_id: String, version_id: String },

    #[error("No pending value stored under version {version_id} of secret '{secret_id}'")]
    PendingValueMissing { secret_id: String, version_id: String },

    #[error("Current credential of secret '{secret_id}' is unreadable: {reason}")]
    CurrentCredentialUnreadable { secret_id: String, reason: String },

    #[error("Failed to refresh credential for secret '{secret_id}': {source}")]
    ProviderRefreshFailed {
        secret_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Pending credential {version_id} of secret '{secret_id}' failed validation: {source}")]
    ProviderValidationFailed {
        secret_id: String,
        version_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Secret store error: {0}")]
    Store(#[from] SecretsError),
}

impl RotationError {
    pub fn unknown_step(step: impl Into<String>) -> Self {
        Self::UnknownStep { step: step.into() }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest { reason: reason.into() }
    }

    pub fn version_not_found(secret_id: &str, version_id: &str) -> Self {
        Self::VersionNotFound {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
        }
    }

    pub fn version_not_pending(secret_id: &str, version_id: &str) -> Self {
        Self::VersionNotPending {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
        }
    }

    pub fn pending_value_missing(secret_id: &str, version_id: &str) -> Self {
        Self::PendingValueMissing {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
        }
    }

    pub fn current_unreadable(secret_id: &str, reason: impl Into<String>) -> Self {
        Self::CurrentCredentialUnreadable {
            secret_id: secret_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn refresh_failed(secret_id: &str, source: ProviderError) -> Self {
        Self::ProviderRefreshFailed { secret_id: secret_id.to_string(), source }
    }

    pub fn validation_failed(secret_id: &str, version_id: &str, source: ProviderError) -> Self {
        Self::ProviderValidationFailed {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
            source,
        }
    }

    /// The request itself or the stored state makes the step impossible.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnknownStep { .. }
                | Self::InvalidRequest { .. }
                | Self::VersionNotFound { .. }
                | Self::VersionNotPending { .. }
                | Self::PendingValueMissing { .. }
                | Self::CurrentCredentialUnreadable { .. }
        )
    }

    /// Re-running the same step with the same token may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderRefreshFailed { source, .. } => !rejected_by_provider(source),
            Self::ProviderValidationFailed { .. } => true,
            Self::Store(err) => matches!(
                err,
                SecretsError::ConnectionFailed { .. } | SecretsError::BackendError { .. }
            ),
            _ => false,
        }
    }

    /// The provider refused to refresh the live credential.
    ///
    /// The current token is most likely expired or revoked; no later step can
    /// recover without a manually re-authorized token.
    pub fn needs_operator(&self) -> bool {
        matches!(self, Self::ProviderRefreshFailed { source, .. } if rejected_by_provider(source))
    }

    /// Short machine-readable kind for status output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownStep { .. } => "unknown_step",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::VersionNotFound { .. } => "version_not_found",
            Self::VersionNotPending { .. } => "version_not_pending",
            Self::PendingValueMissing { .. } => "pending_value_missing",
            Self::CurrentCredentialUnreadable { .. } => "current_credential_unreadable",
            Self::ProviderRefreshFailed { .. } => "provider_refresh_failed",
            Self::ProviderValidationFailed { .. } => "provider_validation_failed",
            Self::Store(_) => "store_failed",
        }
    }
}

fn rejected_by_provider(source: &ProviderError) -> bool {
    matches!(source.status(), Some(400 | 401 | 403))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> ProviderError {
        ProviderError::Status { operation: "refresh", status: 400, body: "expired".into() }
    }

    #[test]
    fn test_preconditions_are_not_retryable() {
        let errors = [
            RotationError::unknown_step("rotate"),
            RotationError::version_not_found("IG_TOKEN", "T1"),
            RotationError::version_not_pending("IG_TOKEN", "T1"),
            RotationError::pending_value_missing("IG_TOKEN", "T1"),
            RotationError::current_unreadable("IG_TOKEN", "empty"),
        ];
        for err in errors {
            assert!(err.is_precondition(), "{err}");
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_rejected_refresh_needs_operator() {
        let err = RotationError::refresh_failed("IG_TOKEN", rejected());
        assert!(err.needs_operator());
        assert!(!err.is_retryable());
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_transient_refresh_is_retryable() {
        let source =
            ProviderError::Status { operation: "refresh", status: 503, body: String::new() };
        let err = RotationError::refresh_failed("IG_TOKEN", source);
        assert!(err.is_retryable());
        assert!(!err.needs_operator());
    }

    #[test]
    fn test_store_errors_are_verbatim() {
        let err: RotationError = SecretsError::connection_failed("timeout").into();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "store_failed");

        let err: RotationError = SecretsError::read_only("env store").into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_messages_name_the_sub_operation() {
        let err = RotationError::validation_failed(
            "IG_TOKEN",
            "T1",
            ProviderError::invalid_response("validate", "response has no subject id"),
        );
        let message = err.to_string();
        assert!(message.contains("T1"));
        assert!(message.contains("validate"));
    }
}
