//! Process-local versioned secret store.
//!
//! Holds every version of every secret together with its stage labels and
//! applies each mutation under a single write lock, so relabeling is atomic
//! and a secret never has more than one CURRENT version.
//!
//! Used as the test double for the rotation workflow and as the `memory`
//! backend for local dry runs, where it is seeded from the environment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::client::{SecretStore, SecretStoreType, SecretVersions, StageLabel};
use super::error::{Result, SecretsError};
use super::types::SecretString;

#[derive(Debug, Clone)]
struct StoredVersion {
    value: Option<SecretString>,
    stages: BTreeSet<StageLabel>,
    created_at: DateTime<Utc>,
}

impl StoredVersion {
    fn new(value: Option<SecretString>, stages: impl IntoIterator<Item = StageLabel>) -> Self {
        Self { value, stages: stages.into_iter().collect(), created_at: Utc::now() }
    }

    fn unfilled() -> Self {
        Self::new(None, Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
struct SecretRecord {
    versions: BTreeMap<String, StoredVersion>,
}

impl SecretRecord {
    fn remove_label_everywhere(&mut self, label: &StageLabel) {
        for version in self.versions.values_mut() {
            version.stages.remove(label);
        }
    }

    fn version_with(&self, label: &StageLabel) -> Option<&str> {
        self.versions
            .iter()
            .find(|(_, v)| v.stages.contains(label))
            .map(|(id, _)| id.as_str())
    }
}

/// In-memory implementation of [`SecretStore`].
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, SecretRecord>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` as a new version of `secret_id` and label it CURRENT.
    ///
    /// Returns the generated version id.
    pub async fn insert_current(&self, secret_id: &str, value: impl Into<SecretString>) -> String {
        let version_id = uuid::Uuid::new_v4().to_string();
        let mut secrets = self.secrets.write().await;
        let record = secrets.entry(secret_id.to_string()).or_default();

        if let Some(previous) = record.version_with(&StageLabel::Current).map(str::to_string) {
            record.remove_label_everywhere(&StageLabel::Previous);
            if let Some(version) = record.versions.get_mut(&previous) {
                version.stages.remove(&StageLabel::Current);
                version.stages.insert(StageLabel::Previous);
            }
        }

        record.versions.insert(
            version_id.clone(),
            StoredVersion::new(Some(value.into()), [StageLabel::Current]),
        );
        tracing::debug!(secret_id = %secret_id, version_id = %version_id, "Inserted current version");
        version_id
    }

    /// Register `version_id` as PENDING without a value.
    ///
    /// This is what the rotation coordinator does before invoking the first
    /// rotation step.
    pub async fn stage_pending(&self, secret_id: &str, version_id: &str) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let record =
            secrets.get_mut(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        record.remove_label_everywhere(&StageLabel::Pending);
        record
            .versions
            .entry(version_id.to_string())
            .or_insert_with(StoredVersion::unfilled)
            .stages
            .insert(StageLabel::Pending);
        Ok(())
    }

    /// Number of stored versions of `secret_id` (zero if unknown).
    pub async fn version_count(&self, secret_id: &str) -> usize {
        let secrets = self.secrets.read().await;
        secrets.get(secret_id).map_or(0, |record| record.versions.len())
    }

    /// When the given version was first registered.
    pub async fn version_created_at(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Option<DateTime<Utc>> {
        let secrets = self.secrets.read().await;
        secrets.get(secret_id)?.versions.get(version_id).map(|v| v.created_at)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString> {
        let secrets = self.secrets.read().await;
        let record = secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        record
            .versions
            .values()
            .find(|v| v.stages.contains(&StageLabel::Current))
            .and_then(|v| v.value.clone())
            .ok_or_else(|| SecretsError::not_found(format!("{} (no current version)", secret_id)))
    }

    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>> {
        let secrets = self.secrets.read().await;
        let record = secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;
        Ok(record.versions.get(version_id).and_then(|v| v.value.clone()))
    }

    async fn put_pending_value(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let record =
            secrets.get_mut(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        if let Some(existing) = record.versions.get(version_id).and_then(|v| v.value.as_ref()) {
            if existing != value {
                return Err(SecretsError::version_conflict(secret_id, version_id));
            }
        }

        record.remove_label_everywhere(&StageLabel::Pending);
        let version = record
            .versions
            .entry(version_id.to_string())
            .or_insert_with(StoredVersion::unfilled);
        version.value = Some(value.clone());
        version.stages.insert(StageLabel::Pending);

        tracing::debug!(secret_id = %secret_id, version_id = %version_id, "Stored pending version");
        Ok(())
    }

    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions> {
        let secrets = self.secrets.read().await;
        let record = secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        let mut versions = SecretVersions::new();
        for (id, version) in &record.versions {
            versions.insert(id.clone(), version.stages.iter().cloned().collect());
        }
        Ok(versions)
    }

    async fn promote_to_current(&self, secret_id: &str, version_id: &str) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let record =
            secrets.get_mut(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        match record.versions.get(version_id) {
            Some(version) if version.value.is_some() => {}
            _ => {
                return Err(SecretsError::not_found(format!("{} version {}", secret_id, version_id)))
            }
        }

        let previous = record.version_with(&StageLabel::Current).map(str::to_string);
        if previous.as_deref() == Some(version_id) {
            return Ok(());
        }

        if let Some(previous) = previous {
            record.remove_label_everywhere(&StageLabel::Previous);
            if let Some(old) = record.versions.get_mut(&previous) {
                old.stages.remove(&StageLabel::Current);
                old.stages.insert(StageLabel::Previous);
            }
        }

        if let Some(promoted) = record.versions.get_mut(version_id) {
            promoted.stages.remove(&StageLabel::Pending);
            promoted.stages.insert(StageLabel::Current);
        }

        tracing::info!(secret_id = %secret_id, version_id = %version_id, "Promoted version to current");
        Ok(())
    }

    fn backend_type(&self) -> SecretStoreType {
        SecretStoreType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_current_demotes_previous() {
        let store = InMemorySecretStore::new();
        let v1 = store.insert_current("IG_TOKEN", "one").await;
        let v2 = store.insert_current("IG_TOKEN", "two").await;

        let versions = store.describe_versions("IG_TOKEN").await.unwrap();
        assert_eq!(versions.current_version(), Some(v2.as_str()));
        assert!(versions.has_stage(&v1, &StageLabel::Previous));
        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "two");
    }

    #[tokio::test]
    async fn test_stage_pending_has_no_value() {
        let store = InMemorySecretStore::new();
        store.insert_current("IG_TOKEN", "old").await;
        store.stage_pending("IG_TOKEN", "T1").await.unwrap();

        let versions = store.describe_versions("IG_TOKEN").await.unwrap();
        assert!(versions.has_stage("T1", &StageLabel::Pending));
        assert!(store.get_version_value("IG_TOKEN", "T1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_pending_is_idempotent_per_token() {
        let store = InMemorySecretStore::new();
        store.insert_current("IG_TOKEN", "old").await;
        let value = SecretString::new("new");

        store.put_pending_value("IG_TOKEN", "T1", &value).await.unwrap();
        store.put_pending_value("IG_TOKEN", "T1", &value).await.unwrap();
        assert_eq!(store.version_count("IG_TOKEN").await, 2);

        let err = store
            .put_pending_value("IG_TOKEN", "T1", &SecretString::new("other"))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_pending_label_moves_to_latest_token() {
        let store = InMemorySecretStore::new();
        store.insert_current("IG_TOKEN", "old").await;
        store.put_pending_value("IG_TOKEN", "T1", &"a".into()).await.unwrap();
        store.put_pending_value("IG_TOKEN", "T2", &"b".into()).await.unwrap();

        let versions = store.describe_versions("IG_TOKEN").await.unwrap();
        assert_eq!(versions.versions_with(&StageLabel::Pending), vec!["T2"]);
    }

    #[tokio::test]
    async fn test_promote_moves_current_and_keeps_old_data() {
        let store = InMemorySecretStore::new();
        let old = store.insert_current("IG_TOKEN", "old").await;
        store.put_pending_value("IG_TOKEN", "T1", &"new".into()).await.unwrap();

        store.promote_to_current("IG_TOKEN", "T1").await.unwrap();

        let versions = store.describe_versions("IG_TOKEN").await.unwrap();
        assert_eq!(versions.versions_with(&StageLabel::Current), vec!["T1"]);
        assert!(!versions.has_stage("T1", &StageLabel::Pending));
        assert!(versions.has_stage(&old, &StageLabel::Previous));
        assert_eq!(
            store.get_version_value("IG_TOKEN", &old).await.unwrap().unwrap().expose_secret(),
            "old"
        );
        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "new");
    }

    #[tokio::test]
    async fn test_promote_without_value_leaves_labels_untouched() {
        let store = InMemorySecretStore::new();
        let old = store.insert_current("IG_TOKEN", "old").await;
        store.stage_pending("IG_TOKEN", "T1").await.unwrap();

        let before = store.describe_versions("IG_TOKEN").await.unwrap();
        let err = store.promote_to_current("IG_TOKEN", "T1").await.unwrap_err();
        assert!(matches!(err, SecretsError::NotFound { .. }));

        let after = store.describe_versions("IG_TOKEN").await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after.current_version(), Some(old.as_str()));
    }

    #[tokio::test]
    async fn test_promote_current_version_is_noop() {
        let store = InMemorySecretStore::new();
        let v1 = store.insert_current("IG_TOKEN", "old").await;
        store.promote_to_current("IG_TOKEN", &v1).await.unwrap();

        let versions = store.describe_versions("IG_TOKEN").await.unwrap();
        assert_eq!(versions.versions_with(&StageLabel::Current), vec![v1.as_str()]);
    }

    #[tokio::test]
    async fn test_unknown_secret() {
        let store = InMemorySecretStore::new();
        assert!(matches!(
            store.get_current_value("missing").await.unwrap_err(),
            SecretsError::NotFound { .. }
        ));
        assert!(store.describe_versions("missing").await.is_err());
        assert!(store.stage_pending("missing", "T1").await.is_err());
    }
}
