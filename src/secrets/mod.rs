//! Versioned secret storage with staged labels.
//!
//! The rotation workflow and the digest workflow both talk to secret storage
//! through the [`SecretStore`] trait:
//! - **get_current_value**: value of the version labeled CURRENT
//! - **get_version_value**: value of a specific version (e.g. the pending one)
//! - **put_pending_value**: token-scoped write labeled PENDING
//! - **describe_versions**: version id → stage labels
//! - **promote_to_current**: atomic relabel of CURRENT
//!
//! # Backends
//!
//! - **AWS Secrets Manager** (`aws` feature): production store
//! - **In-memory**: versioned store for tests and local dry runs
//! - **Environment variables**: read-only development fallback using the
//!   `SOCIAL_DIGEST_SECRET_*` prefix
//!
//! [`CachedSecretStore`] adds a TTL cache over current values for readers that
//! tolerate bounded staleness.
//!
//! # Composable Example
//!
//! ```rust,ignore
//! use social_digest::secrets::{AwsSecretStore, AwsSecretStoreConfig, CachedSecretStore};
//! use std::time::Duration;
//!
//! let aws = AwsSecretStore::new(AwsSecretStoreConfig::default()).await?;
//! let readers = CachedSecretStore::new(aws, Duration::from_secs(300));
//! let token = readers.get_current_value("INSTAGRAM_SECRET_KEY").await?;
//! ```
//!
//! # Security Considerations
//!
//! - Values are carried as [`SecretString`] and never logged
//! - Error messages name secrets and versions, never values

#[cfg(feature = "aws")]
pub mod aws;
pub mod cached;
pub mod client;
pub mod credential;
pub mod env;
pub mod error;
pub mod memory;
pub mod types;

#[cfg(feature = "aws")]
pub use aws::{AwsSecretStore, AwsSecretStoreConfig};
pub use cached::CachedSecretStore;
pub use client::{SecretStore, SecretStoreType, SecretVersions, StageLabel};
pub use credential::{extract_secret_field, CredentialPayload};
pub use env::EnvVarSecretStore;
pub use error::{Result, SecretsError};
pub use memory::InMemorySecretStore;
pub use types::SecretString;
