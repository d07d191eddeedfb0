//! Cached secret store with a bounded staleness window.
//!
//! Wraps any [`SecretStore`] and caches `get_current_value` results for a
//! configured TTL. A caller may therefore observe a value up to one TTL old
//! after a rotation promoted a new version elsewhere; writes and promotions
//! made *through* this wrapper invalidate the affected secret immediately.
//!
//! Only the digest workflow reads through this cache. The rotation workflow
//! always uses the uncached store so every step re-reads fresh state.
//!
//! # Example
//!
//! ```rust,ignore
//! use social_digest::secrets::{CachedSecretStore, InMemorySecretStore};
//! use std::time::Duration;
//!
//! let store = CachedSecretStore::new(InMemorySecretStore::new(), Duration::from_secs(300));
//! let token = store.get_current_value("INSTAGRAM_SECRET_KEY").await?;
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::client::{SecretStore, SecretStoreType, SecretVersions};
use super::error::Result;
use super::types::SecretString;

/// Cached secret entry with TTL.
#[derive(Debug, Clone)]
struct CachedSecret {
    value: SecretString,
    cached_at: Instant,
}

impl CachedSecret {
    fn new(value: SecretString) -> Self {
        Self { value, cached_at: Instant::now() }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// TTL cache over the current value of each secret.
///
/// Version-specific reads and describe calls always hit the inner store.
pub struct CachedSecretStore<T: SecretStore> {
    inner: T,
    cache: Arc<RwLock<HashMap<String, CachedSecret>>>,
    ttl: Duration,
}

impl<T: SecretStore> CachedSecretStore<T> {
    /// Creates a new cached store; `ttl` is the staleness tolerance.
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self { inner, cache: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached value for one secret.
    pub async fn invalidate(&self, secret_id: &str) {
        let mut cache = self.cache.write().await;
        if cache.remove(secret_id).is_some() {
            tracing::debug!(secret_id = %secret_id, "Invalidated cached secret");
        }
    }

    /// Clear the entire cache.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        let count = cache.len();
        cache.clear();
        tracing::info!(count = count, "Cleared secrets cache");
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<T: SecretStore> SecretStore for CachedSecretStore<T> {
    async fn get_current_value(&self, secret_id: &str) -> Result<SecretString> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(secret_id) {
                if !cached.is_expired(self.ttl) {
                    tracing::debug!(secret_id = %secret_id, "Cache hit for secret");
                    return Ok(cached.value.clone());
                }
                tracing::debug!(secret_id = %secret_id, "Cached secret expired");
            }
        }

        tracing::debug!(secret_id = %secret_id, "Cache miss, fetching from backend");
        let value = self.inner.get_current_value(secret_id).await?;

        let mut cache = self.cache.write().await;
        cache.insert(secret_id.to_string(), CachedSecret::new(value.clone()));

        Ok(value)
    }

    async fn get_version_value(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretString>> {
        self.inner.get_version_value(secret_id, version_id).await
    }

    async fn put_pending_value(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> Result<()> {
        self.inner.put_pending_value(secret_id, version_id, value).await
    }

    async fn describe_versions(&self, secret_id: &str) -> Result<SecretVersions> {
        self.inner.describe_versions(secret_id).await
    }

    async fn promote_to_current(&self, secret_id: &str, version_id: &str) -> Result<()> {
        let result = self.inner.promote_to_current(secret_id, version_id).await;
        self.invalidate(secret_id).await;
        result
    }

    fn backend_type(&self) -> SecretStoreType {
        self.inner.backend_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::InMemorySecretStore;

    #[tokio::test]
    async fn test_cache_hit_serves_stale_value_within_ttl() {
        let backing = InMemorySecretStore::new();
        backing.insert_current("IG_TOKEN", "first").await;

        let store = CachedSecretStore::new(backing.clone(), Duration::from_secs(60));
        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "first");
        assert_eq!(store.cache_size().await, 1);

        // Changed behind the cache's back: still within tolerance.
        backing.insert_current("IG_TOKEN", "second").await;
        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "first");
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let backing = InMemorySecretStore::new();
        backing.insert_current("IG_TOKEN", "first").await;

        let store = CachedSecretStore::new(backing.clone(), Duration::from_millis(50));
        store.get_current_value("IG_TOKEN").await.unwrap();

        backing.insert_current("IG_TOKEN", "second").await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "second");
    }

    #[tokio::test]
    async fn test_promotion_invalidates() {
        let backing = InMemorySecretStore::new();
        backing.insert_current("IG_TOKEN", "old").await;

        let store = CachedSecretStore::new(backing, Duration::from_secs(3600));
        store.get_current_value("IG_TOKEN").await.unwrap();

        store.put_pending_value("IG_TOKEN", "T1", &"new".into()).await.unwrap();
        store.promote_to_current("IG_TOKEN", "T1").await.unwrap();

        assert_eq!(store.cache_size().await, 0);
        assert_eq!(store.get_current_value("IG_TOKEN").await.unwrap().expose_secret(), "new");
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let backing = InMemorySecretStore::new();
        backing.insert_current("A", "a").await;
        backing.insert_current("B", "b").await;

        let store = CachedSecretStore::new(backing, Duration::from_secs(60));
        store.get_current_value("A").await.unwrap();
        store.get_current_value("B").await.unwrap();
        assert_eq!(store.cache_size().await, 2);

        store.clear_cache().await;
        assert_eq!(store.cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let store = CachedSecretStore::new(InMemorySecretStore::new(), Duration::from_secs(60));
        assert!(store.get_current_value("missing").await.is_err());
        assert_eq!(store.cache_size().await, 0);
    }
}
