//! Core secret store trait and version/stage types.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::Result;
use super::types::SecretString;

/// Stage label attached to a secret version.
///
/// The store-specific literals (`AWSCURRENT`, `AWSPENDING`, `AWSPREVIOUS`) are
/// treated as opaque values; labels this crate does not know about are kept
/// verbatim in [`StageLabel::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageLabel {
    Current,
    Pending,
    Previous,
    Custom(String),
}

impl StageLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Current => "AWSCURRENT",
            Self::Pending => "AWSPENDING",
            Self::Previous => "AWSPREVIOUS",
            Self::Custom(label) => label,
        }
    }
}

impl From<&str> for StageLabel {
    fn from(s: &str) -> Self {
        match s {
            "AWSCURRENT" => Self::Current,
            "AWSPENDING" => Self::Pending,
            "AWSPREVIOUS" => Self::Previous,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StageLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Mapping of version id to the stage labels attached to it.
///
/// Mirrors the `VersionIdsToStages` shape returned by a describe call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretVersions(BTreeMap<String, Vec<StageLabel>>);

impl SecretVersions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version_id: impl Into<String>, stages: Vec<StageLabel>) {
        self.0.insert(version_id.into(), stages);
    }

    /// Builder-style insert, mostly for tests and adapters.
    pub fn with_version(mut self, version_id: impl Into<String>, stages: Vec<StageLabel>) -> Self {
        self.insert(version_id, stages);
        self
    }

    pub fn contains(&self, version_id: &str) -> bool {
        self.0.contains_key(version_id)
    }

    pub fn stages(&self, version_id: &str) -> Option<&[StageLabel]> {
        self.0.get(version_id).map(Vec::as_slice)
    }

    pub fn has_stage(&self, version_id: &str, label: &StageLabel) -> bool {
        self.stages(version_id).is_some_and(|stages| stages.contains(label))
    }

    /// All version ids carrying `label`, in version-id order.
    pub fn versions_with(&self, label: &StageLabel) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, stages)| stages.contains(label))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// The version currently labeled CURRENT, if any.
    pub fn current_version(&self) -> Option<&str> {
        self.versions_with(&StageLabel::Current).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StageLabel])> {
        self.0.iter().map(|(id, stages)| (id.as_str(), stages.as_slice()))
    }
}

/// Type of secret store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretStoreType {
    /// AWS Secrets Manager
    Aws,
    /// Process-local versioned store
    Memory,
    /// Read-only environment variables
    Env,
}

impl SecretStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Memory => "memory",
            Self::Env => "env",
        }
    }
}

impl FromStr for SecretStoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "aws_secrets_manager" => Ok(Self::Aws),
            "memory" => Ok(Self::Memory),
            "env" => Ok(Self::Env),
            other => Err(format!("Unknown secret store backend: {}", other)),
        }
    }
}

impl fmt::Display for SecretStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versioned key/value store with staged labels.
///
/// The store, not its callers, is the source of truth for which version is
/// current and must keep at most one version labeled CURRENT per secret.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Errors MUST NOT embed secret values
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Value of the version labeled CURRENT.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`] if the secret or its current version doesn't exist
    /// - [`SecretsError::ConnectionFailed`] if the backend is unreachable
    ///
    /// [`SecretsError::NotFound`]: super::SecretsError::NotFound
    /// [`SecretsError::ConnectionFailed`]: super::SecretsError::ConnectionFailed
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString>;

    /// Value stored under a specific version id.
    ///
    /// Returns `Ok(None)` when the version is unknown or registered without a
    /// value yet (a coordinator may stage the version before any write).
    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>>;

    /// Write `value` under `version_id` and label it PENDING.
    ///
    /// Writing the same value twice under one token succeeds; a different value
    /// under an existing token fails with [`SecretsError::VersionConflict`].
    ///
    /// [`SecretsError::VersionConflict`]: super::SecretsError::VersionConflict
    async fn put_pending_value(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> Result<()>;

    /// Version ids of the secret with their stage labels.
    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions>;

    /// Atomically move the CURRENT label onto `version_id`.
    ///
    /// The previously current version keeps its data.
    async fn promote_to_current(&self, secret_id: &str, version_id: &str) -> Result<()>;

    /// Get the backend type identifier
    fn backend_type(&self) -> SecretStoreType;
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString> {
        (**self).get_current_value(secret_id).await
    }

    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>> {
        (**self).get_version_value(secret_id, version_id).await
    }

    async fn put_pending_value(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> Result<()> {
        (**self).put_pending_value(secret_id, version_id, value).await
    }

    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions> {
        (**self).describe_versions(secret_id).await
    }

    async fn promote_to_current(&self, secret_id: &str, version_id: &str) -> Result<()> {
        (**self).promote_to_current(secret_id, version_id).await
    }

    fn backend_type(&self) -> SecretStoreType {
        (**self).backend_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_label_literals() {
        assert_eq!(StageLabel::Current.as_str(), "AWSCURRENT");
        assert_eq!(StageLabel::Pending.as_str(), "AWSPENDING");
        assert_eq!(StageLabel::from("AWSPREVIOUS"), StageLabel::Previous);
        assert_eq!(StageLabel::from("MY_LABEL"), StageLabel::Custom("MY_LABEL".to_string()));
    }

    #[test]
    fn test_versions_deserialize_from_describe_shape() {
        let json = r#"{
            "11111111-2222-3333-4444-555555555555": ["AWSPENDING"],
            "99999999-8888-7777-6666-555555555555": ["AWSCURRENT"]
        }"#;
        let versions: SecretVersions = serde_json::from_str(json).unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(versions.current_version(), Some("99999999-8888-7777-6666-555555555555"));
        assert!(versions
            .has_stage("11111111-2222-3333-4444-555555555555", &StageLabel::Pending));
        assert!(!versions.contains("unknown"));
    }

    #[test]
    fn test_versions_with_label() {
        let versions = SecretVersions::new()
            .with_version("v1", vec![StageLabel::Previous])
            .with_version("v2", vec![StageLabel::Current])
            .with_version("v3", vec![StageLabel::Pending, StageLabel::Custom("X".into())]);

        assert_eq!(versions.versions_with(&StageLabel::Pending), vec!["v3"]);
        assert_eq!(versions.current_version(), Some("v2"));
        assert_eq!(versions.stages("v1"), Some(&[StageLabel::Previous][..]));
    }

    #[test]
    fn test_store_type_parse() {
        assert_eq!("aws".parse::<SecretStoreType>().unwrap(), SecretStoreType::Aws);
        assert_eq!(" Memory ".parse::<SecretStoreType>().unwrap(), SecretStoreType::Memory);
        assert!("vault".parse::<SecretStoreType>().is_err());
        assert_eq!(SecretStoreType::Env.to_string(), "env");
    }
}
