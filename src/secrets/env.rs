//! Environment variable secret store.
//!
//! Read-only backend intended for **local development and testing**. Each
//! secret is exposed as a single CURRENT version; every write fails, so the
//! rotation workflow cannot run against it.
//!
//! Secrets are read from variables with the `SOCIAL_DIGEST_SECRET_` prefix:
//!
//! ```bash
//! export SOCIAL_DIGEST_SECRET_INSTAGRAM_SECRET_KEY='{"access_token":"IGQVJ..."}'
//! export SOCIAL_DIGEST_SECRET_OPEN_AI_SECRET_KEY='sk-...'
//! ```

use async_trait::async_trait;
use std::env;

use super::client::{SecretStore, SecretStoreType, SecretVersions, StageLabel};
use super::error::{Result, SecretsError};
use super::types::SecretString;

/// Environment variable prefix for secrets.
pub const SECRET_PREFIX: &str = "SOCIAL_DIGEST_SECRET_";

/// Version id reported for every environment-backed secret.
pub const ENV_VERSION_ID: &str = "env";

/// Environment variable secret store (development only).
#[derive(Debug, Clone, Default)]
pub struct EnvVarSecretStore {}

impl EnvVarSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a secret id to the environment variable name.
    ///
    /// Characters that are not valid in variable names (`-`, `/`, `.`) become `_`.
    pub fn env_var_name(secret_id: &str) -> String {
        let normalized: String = secret_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", SECRET_PREFIX, normalized)
    }

    /// Read the secret directly, `None` when the variable is unset or empty.
    pub fn lookup(&self, secret_id: &str) -> Option<SecretString> {
        env::var(Self::env_var_name(secret_id))
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::new)
    }
}

#[async_trait]
impl SecretStore for EnvVarSecretStore {
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString> {
        self.lookup(secret_id).ok_or_else(|| {
            SecretsError::not_found(format!(
                "{} (looking for {})",
                secret_id,
                Self::env_var_name(secret_id)
            ))
        })
    }

    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>> {
        if version_id != ENV_VERSION_ID {
            return Ok(None);
        }
        Ok(self.lookup(secret_id))
    }

    async fn put_pending_value(
        &self,
        secret_id: &str,
        _version_id: &str,
        _value: &SecretString,
    ) -> Result<()> {
        Err(SecretsError::read_only(format!(
            "cannot write '{}' - environment variables are read-only",
            secret_id
        )))
    }

    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions> {
        self.get_current_value(secret_id).await?;
        Ok(SecretVersions::new().with_version(ENV_VERSION_ID, vec![StageLabel::Current]))
    }

    async fn promote_to_current(&self, secret_id: &str, _version_id: &str) -> Result<()> {
        Err(SecretsError::read_only(format!(
            "cannot promote '{}' - environment variables are read-only",
            secret_id
        )))
    }

    fn backend_type(&self) -> SecretStoreType {
        SecretStoreType::Env
    }
}
