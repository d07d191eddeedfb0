//! Common test utilities for all integration tests.
//!
//! Provides an in-memory secret store seeded like a live rotation and a
//! Graph token provider pointed at a wiremock server.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::sync::Arc;

use social_digest::provider::{GraphTokenProvider, GraphTokenProviderConfig};
use social_digest::rotation::RotationWorkflow;
use social_digest::secrets::{InMemorySecretStore, SecretStore, SecretVersions};
use wiremock::MockServer;

pub const SECRET_ID: &str = "IG_TOKEN";
pub const TOKEN: &str = "T1";
pub const OLD_VALUE: &str = r#"{"access_token":"OLD"}"#;

/// Store with `OLD_VALUE` as CURRENT and `TOKEN` staged PENDING without a
/// value, as the coordinator leaves it before `createSecret`.
///
/// Returns the store and the version id of the current value.
pub async fn staged_store() -> (InMemorySecretStore, String) {
    let store = InMemorySecretStore::new();
    let current_version = store.insert_current(SECRET_ID, OLD_VALUE).await;
    store.stage_pending(SECRET_ID, TOKEN).await.unwrap();
    (store, current_version)
}

pub fn graph_provider(server: &MockServer) -> GraphTokenProvider {
    GraphTokenProvider::new(GraphTokenProviderConfig {
        instagram_base_url: server.uri(),
        graph_base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

pub fn workflow(store: &InMemorySecretStore, server: &MockServer) -> RotationWorkflow {
    RotationWorkflow::new(Arc::new(store.clone()), Arc::new(graph_provider(server)))
}

/// Everything observable about one secret: labels, the token's value and
/// the current value.
#[derive(Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub versions: SecretVersions,
    pub token_value: Option<String>,
    pub current_value: Option<String>,
}

pub async fn snapshot(store: &InMemorySecretStore) -> Snapshot {
    Snapshot {
        versions: store.describe_versions(SECRET_ID).await.unwrap(),
        token_value: store
            .get_version_value(SECRET_ID, TOKEN)
            .await
            .unwrap()
            .map(|v| v.expose_secret().to_string()),
        current_value: store
            .get_current_value(SECRET_ID)
            .await
            .ok()
            .map(|v| v.expose_secret().to_string()),
    }
}
