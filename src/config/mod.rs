//! # Configuration Management
//!
//! Environment-driven configuration for the rotation and digest entry points.
//! A `.env` file is loaded by the binary before anything here runs.

pub mod settings;

pub use settings::{
    AppConfig, DigestConfig, EmailConfig, ObservabilityConfig, ProviderConfig, SecretStoreConfig,
    StubFlags,
};
