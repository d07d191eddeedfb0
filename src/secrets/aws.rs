//! AWS Secrets Manager secret store.
//!
//! Maps the [`SecretStore`] operations onto Secrets Manager calls:
//!
//! | Operation | API call |
//! |---|---|
//! | `get_current_value` | `GetSecretValue` with `VersionStage=AWSCURRENT` |
//! | `get_version_value` | `GetSecretValue` with `VersionId` |
//! | `put_pending_value` | `PutSecretValue` with `ClientRequestToken`, `VersionStages=[AWSPENDING]` |
//! | `describe_versions` | `DescribeSecret` → `VersionIdsToStages` |
//! | `promote_to_current` | `UpdateSecretVersionStage` moving `AWSCURRENT` |
//!
//! Credentials come from the default AWS provider chain (environment, shared
//! profile, or the execution role).

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client as SecretsManagerClient;

use super::client::{SecretStore, SecretStoreType, SecretVersions, StageLabel};
use super::error::{Result, SecretsError};
use super::types::SecretString;

/// Connection settings for AWS Secrets Manager.
#[derive(Debug, Clone, Default)]
pub struct AwsSecretStoreConfig {
    /// AWS region (falls back to the SDK's environment detection if None)
    pub region: Option<String>,

    /// Custom endpoint URL (for LocalStack or other AWS-compatible services)
    pub endpoint_url: Option<String>,
}

/// [`SecretStore`] backed by AWS Secrets Manager.
#[derive(Clone)]
pub struct AwsSecretStore {
    client: SecretsManagerClient,
    config: AwsSecretStoreConfig,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore").field("config", &self.config).finish()
    }
}

impl AwsSecretStore {
    /// Load the SDK configuration and build the client.
    pub async fn new(config: AwsSecretStoreConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let client = SecretsManagerClient::new(&sdk_config);

        tracing::info!(
            provider = "AWS Secrets Manager",
            region = ?config.region,
            endpoint = ?config.endpoint_url,
            "Initialized AWS Secrets Manager store"
        );

        Ok(Self { client, config })
    }

    /// Wrap an already-built client.
    pub fn from_client(client: SecretsManagerClient) -> Self {
        Self { client, config: AwsSecretStoreConfig::default() }
    }
}

fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|se| se.code()) == Some("ResourceNotFoundException")
}

fn sdk_error<E>(operation: &str, secret_id: &str, err: E) -> SecretsError
where
    E: std::error::Error,
{
    SecretsError::backend_error(format!("{} failed for '{}': {}", operation, secret_id, err))
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(StageLabel::Current.as_str())
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    SecretsError::not_found(secret_id)
                } else {
                    sdk_error("GetSecretValue", secret_id, e)
                }
            })?;

        output
            .secret_string()
            .map(SecretString::from)
            .ok_or_else(|| {
                SecretsError::invalid_value(format!("secret '{}' has no string value", secret_id))
            })
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>> {
        let result =
            self.client.get_secret_value().secret_id(secret_id).version_id(version_id).send().await;

        match result {
            Ok(output) => Ok(output.secret_string().map(SecretString::from)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(sdk_error("GetSecretValue", secret_id, e)),
        }
    }

    #[tracing::instrument(skip(self, value), fields(provider = "AWS"))]
    async fn put_pending_value(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> Result<()> {
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(version_id)
            .secret_string(value.expose_secret())
            .version_stages(StageLabel::Pending.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_resource_exists_exception()) {
                    SecretsError::version_conflict(secret_id, version_id)
                } else {
                    sdk_error("PutSecretValue", secret_id, e)
                }
            })?;

        tracing::debug!(secret_id = %secret_id, version_id = %version_id, "Stored pending version");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions> {
        let output =
            self.client.describe_secret().secret_id(secret_id).send().await.map_err(|e| {
                if is_not_found(&e) {
                    SecretsError::not_found(secret_id)
                } else {
                    sdk_error("DescribeSecret", secret_id, e)
                }
            })?;

        let mut versions = SecretVersions::new();
        if let Some(map) = output.version_ids_to_stages() {
            for (version_id, stages) in map {
                versions.insert(
                    version_id.clone(),
                    stages.iter().map(|s| StageLabel::from(s.as_str())).collect(),
                );
            }
        }
        Ok(versions)
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn promote_to_current(&self, secret_id: &str, version_id: &str) -> Result<()> {
        let versions = self.describe_versions(secret_id).await?;
        let current = versions.current_version().map(str::to_string);

        if current.as_deref() == Some(version_id) {
            tracing::info!(secret_id = %secret_id, version_id = %version_id, "Already current");
            return Ok(());
        }

        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(StageLabel::Current.as_str())
            .move_to_version_id(version_id)
            .set_remove_from_version_id(current)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateSecretVersionStage", secret_id, e))?;

        tracing::info!(secret_id = %secret_id, version_id = %version_id, "Promoted version to current");
        Ok(())
    }

    fn backend_type(&self) -> SecretStoreType {
        SecretStoreType::Aws
    }
}
