//! The four-step rotation state machine.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

use super::error::{Result, RotationError};
use super::request::{RotationRequest, RotationStep};
use crate::provider::TokenProvider;
use crate::secrets::{CredentialPayload, SecretStore, SecretVersions, StageLabel};

/// How a successful step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationOutcome {
    /// The step ran to completion.
    Completed,
    /// The token's version is already CURRENT; nothing to do.
    AlreadyCurrent,
    /// `createSecret` found a value under the token and did not mint another.
    PendingAlreadyCreated,
}

impl RotationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyCurrent => "already_current",
            Self::PendingAlreadyCreated => "pending_already_created",
        }
    }
}

impl fmt::Display for RotationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes rotation steps against a secret store and a token provider.
///
/// Holds no state between invocations: every step re-reads what it needs from
/// the store, and the only mutation of each step is its last action.
#[derive(Clone)]
pub struct RotationWorkflow {
    store: Arc<dyn SecretStore>,
    provider: Arc<dyn TokenProvider>,
}

impl fmt::Debug for RotationWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationWorkflow")
            .field("store", &self.store.backend_type())
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl RotationWorkflow {
    pub fn new(store: Arc<dyn SecretStore>, provider: Arc<dyn TokenProvider>) -> Self {
        Self { store, provider }
    }

    /// Perform exactly the step named in `request`.
    pub async fn handle(&self, request: &RotationRequest) -> Result<RotationOutcome> {
        let span = crate::rotation_span!(
            request.step,
            request.secret_id,
            request.client_request_token
        );
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: &RotationRequest) -> Result<RotationOutcome> {
        let result = self.run_step(request).await;
        match &result {
            Ok(outcome) => tracing::info!(outcome = %outcome, "Rotation step finished"),
            Err(err) if err.needs_operator() => tracing::error!(
                error = %err,
                "Provider rejected the current credential; it must be re-authorized manually"
            ),
            Err(err) => tracing::error!(
                error = %err,
                kind = err.kind(),
                retryable = err.is_retryable(),
                "Rotation step failed"
            ),
        }
        result
    }

    async fn run_step(&self, request: &RotationRequest) -> Result<RotationOutcome> {
        // Unknown steps fail before the store is touched.
        let step = request.parse_step()?;
        let secret_id = request.secret_id.as_str();
        let token = request.client_request_token.as_str();

        let versions = self.store.describe_versions(secret_id).await?;
        if let Some(outcome) = check_version(&versions, secret_id, token)? {
            tracing::info!("Version already current, nothing to do");
            return Ok(outcome);
        }

        match step {
            RotationStep::CreateSecret => self.create_secret(secret_id, token).await,
            RotationStep::SetSecret => Ok(self.set_secret(secret_id, token)),
            RotationStep::TestSecret => self.test_secret(secret_id, token).await,
            RotationStep::FinishSecret => self.finish_secret(secret_id, token).await,
        }
    }

    /// Mint a new token from the current one and store it as PENDING.
    #[tracing::instrument(skip(self))]
    async fn create_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome> {
        if self.store.get_version_value(secret_id, token).await?.is_some() {
            tracing::info!("Pending value already stored for this token");
            return Ok(RotationOutcome::PendingAlreadyCreated);
        }

        let current_raw = self.store.get_current_value(secret_id).await?;
        let current = CredentialPayload::parse(&current_raw)
            .map_err(|e| RotationError::current_unreadable(secret_id, e.to_string()))?;

        let minted = self
            .provider
            .refresh(&current.access_token)
            .await
            .map_err(|e| RotationError::refresh_failed(secret_id, e))?;

        let pending =
            CredentialPayload::refreshed(minted.access_token, minted.expires_in, Utc::now());
        let value = pending.to_secret_string()?;

        self.store.put_pending_value(secret_id, token, &value).await?;
        tracing::info!(expires_in = ?pending.expires_in, "Stored pending credential");
        Ok(RotationOutcome::Completed)
    }

    /// Nothing downstream needs the new credential pushed to it.
    fn set_secret(&self, secret_id: &str, token: &str) -> RotationOutcome {
        tracing::debug!(secret_id = %secret_id, version_id = %token, "setSecret is a no-op");
        RotationOutcome::Completed
    }

    /// Check the pending token against the live API. Never writes.
    #[tracing::instrument(skip(self))]
    async fn test_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome> {
        let pending = self.pending_payload(secret_id, token).await?;

        let subject = self
            .provider
            .validate(&pending.access_token)
            .await
            .map_err(|e| RotationError::validation_failed(secret_id, token, e))?;

        tracing::info!(subject = %subject, "Pending credential accepted by provider");
        Ok(RotationOutcome::Completed)
    }

    /// Move CURRENT onto the pending version.
    #[tracing::instrument(skip(self))]
    async fn finish_secret(&self, secret_id: &str, token: &str) -> Result<RotationOutcome> {
        if self.store.get_version_value(secret_id, token).await?.is_none() {
            return Err(RotationError::pending_value_missing(secret_id, token));
        }

        self.store.promote_to_current(secret_id, token).await?;
        Ok(RotationOutcome::Completed)
    }

    async fn pending_payload(&self, secret_id: &str, token: &str) -> Result<CredentialPayload> {
        let raw = self
            .store
            .get_version_value(secret_id, token)
            .await?
            .ok_or_else(|| RotationError::pending_value_missing(secret_id, token))?;
        Ok(CredentialPayload::parse(&raw)?)
    }
}

/// Confirm the token is an in-flight rotation of this secret.
///
/// Returns `Some(AlreadyCurrent)` when the token's version already carries
/// CURRENT, `None` when the step should run.
fn check_version(
    versions: &SecretVersions,
    secret_id: &str,
    token: &str,
) -> Result<Option<RotationOutcome>> {
    if !versions.contains(token) {
        return Err(RotationError::version_not_found(secret_id, token));
    }
    if versions.has_stage(token, &StageLabel::Current) {
        return Ok(Some(RotationOutcome::AlreadyCurrent));
    }
    if !versions.has_stage(token, &StageLabel::Pending) {
        return Err(RotationError::version_not_pending(secret_id, token));
    }
    Ok(None)
}
