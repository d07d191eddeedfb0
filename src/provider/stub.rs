//! Offline token provider for local runs.

use async_trait::async_trait;
use chrono::Utc;

use super::{ExternalToken, Result, TokenProvider};
use crate::secrets::SecretString;

/// Subject id reported by [`StubTokenProvider::validate`].
pub const STUB_SUBJECT: &str = "stub-user";

/// Mints `FAKE_REFRESHED_TOKEN_<millis>` and accepts every token.
#[derive(Debug, Clone, Default)]
pub struct StubTokenProvider;

impl StubTokenProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenProvider for StubTokenProvider {
    async fn refresh(&self, _current: &SecretString) -> Result<ExternalToken> {
        tracing::info!("Stub provider minting token");
        let token = format!("FAKE_REFRESHED_TOKEN_{}", Utc::now().timestamp_millis());
        Ok(ExternalToken::new(token, Some(60 * 24 * 60 * 60)))
    }

    async fn validate(&self, _token: &SecretString) -> Result<String> {
        Ok(STUB_SUBJECT.to_string())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
