//! # social-digest
//!
//! Credential rotation for a long-lived Instagram Graph API token, plus a
//! weekly insight digest that reads the rotated token.
//!
//! ## Architecture
//!
//! ```text
//! Rotation coordinator ──► RotationWorkflow ──► SecretStore (versions + stage labels)
//!                               │
//!                               └──► TokenProvider (Graph API refresh / validate)
//!
//! Scheduler ──► DigestWorkflow ──► InsightsSource ─► LanguageModel ─► NotificationSender
//!                    │
//!                    └──► CachedSecretStore (token, API key, SMTP password)
//! ```
//!
//! ## Core Components
//!
//! - **Rotation**: the four-step `createSecret → setSecret → testSecret →
//!   finishSecret` state machine over staged secret versions
//! - **Secrets**: versioned store abstraction with AWS Secrets Manager,
//!   in-memory and environment-variable backends
//! - **Provider**: Graph API token refresh and identity validation
//! - **Digest**: insights fetch, LLM recommendations and SMTP delivery
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use social_digest::provider::StubTokenProvider;
//! use social_digest::rotation::{RotationRequest, RotationWorkflow};
//! use social_digest::secrets::InMemorySecretStore;
//!
//! # async fn run() -> social_digest::Result<()> {
//! let store = InMemorySecretStore::new();
//! store.insert_current("INSTAGRAM_SECRET_KEY", r#"{"access_token":"OLD"}"#).await;
//! store.stage_pending("INSTAGRAM_SECRET_KEY", "T1").await?;
//!
//! let workflow = RotationWorkflow::new(Arc::new(store), Arc::new(StubTokenProvider::new()));
//! let request = RotationRequest::new("INSTAGRAM_SECRET_KEY", "T1", "createSecret");
//! workflow.handle(&request).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod digest;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod rotation;
pub mod secrets;
pub mod startup;
pub mod utils;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use observability::init_logging;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "social-digest");
    }
}
