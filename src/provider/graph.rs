//! Instagram / Facebook Graph API token provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::{ExternalToken, ProviderError, Result, TokenProvider};
use crate::secrets::SecretString;
use crate::utils::{build_http_client, join_url, read_json};

const REFRESH: &str = "refresh";
const VALIDATE: &str = "validate";

/// Grant used to mint a new long-lived token.
#[derive(Clone, PartialEq, Eq)]
pub enum RefreshGrant {
    /// `ig_refresh_token` against the Instagram Graph host.
    IgRefreshToken,
    /// `fb_exchange_token` against the versioned Facebook Graph host.
    FbExchangeToken { app_id: String, app_secret: SecretString },
}

impl RefreshGrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IgRefreshToken => "ig_refresh_token",
            Self::FbExchangeToken { .. } => "fb_exchange_token",
        }
    }
}

impl fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgRefreshToken => f.write_str("IgRefreshToken"),
            Self::FbExchangeToken { app_id, .. } => f
                .debug_struct("FbExchangeToken")
                .field("app_id", app_id)
                .field("app_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Grant kind as named in configuration, before credentials are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrantKind {
    #[default]
    IgRefreshToken,
    FbExchangeToken,
}

impl GrantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IgRefreshToken => "ig_refresh_token",
            Self::FbExchangeToken => "fb_exchange_token",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ig_refresh_token" | "ig" => Ok(Self::IgRefreshToken),
            "fb_exchange_token" | "fb" => Ok(Self::FbExchangeToken),
            other => Err(format!(
                "Unknown token grant '{}'. Expected ig_refresh_token or fb_exchange_token",
                other
            )),
        }
    }
}

/// Endpoints and grant for [`GraphTokenProvider`].
#[derive(Debug, Clone)]
pub struct GraphTokenProviderConfig {
    pub instagram_base_url: String,
    pub graph_base_url: String,
    pub graph_api_version: String,
    pub grant: RefreshGrant,
    pub timeout: Duration,
}

impl Default for GraphTokenProviderConfig {
    fn default() -> Self {
        Self {
            instagram_base_url: "https://graph.instagram.com".to_string(),
            graph_base_url: "https://graph.facebook.com".to_string(),
            graph_api_version: "v16.0".to_string(),
            grant: RefreshGrant::IgRefreshToken,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// [`TokenProvider`] backed by the Graph API.
pub struct GraphTokenProvider {
    client: Client,
    config: GraphTokenProviderConfig,
}

impl GraphTokenProvider {
    pub fn new(config: GraphTokenProviderConfig) -> Result<Self> {
        if let RefreshGrant::FbExchangeToken { app_id, app_secret } = &config.grant {
            if app_id.trim().is_empty() || app_secret.is_empty() {
                return Err(ProviderError::Config(
                    "fb_exchange_token requires an app id and app secret".to_string(),
                ));
            }
        }

        let client = build_http_client(config.timeout)
            .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GraphTokenProviderConfig {
        &self.config
    }

    fn refresh_request(&self, current: &SecretString) -> reqwest::RequestBuilder {
        match &self.config.grant {
            RefreshGrant::IgRefreshToken => self
                .client
                .get(join_url(&self.config.instagram_base_url, "refresh_access_token"))
                .query(&[
                    ("grant_type", "ig_refresh_token"),
                    ("access_token", current.expose_secret()),
                ]),
            RefreshGrant::FbExchangeToken { app_id, app_secret } => {
                let path = format!("{}/oauth/access_token", self.config.graph_api_version);
                self.client.get(join_url(&self.config.graph_base_url, &path)).query(&[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", app_id.as_str()),
                    ("client_secret", app_secret.expose_secret()),
                    ("fb_exchange_token", current.expose_secret()),
                ])
            }
        }
    }
}

#[async_trait]
impl TokenProvider for GraphTokenProvider {
    #[tracing::instrument(skip(self, current), fields(grant = self.config.grant.as_str()))]
    async fn refresh(&self, current: &SecretString) -> Result<ExternalToken> {
        let response = self
            .refresh_request(current)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(REFRESH, e.into()))?;

        let body: TokenResponse =
            read_json(response).await.map_err(|e| ProviderError::from_http(REFRESH, e))?;

        let access_token = body
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(REFRESH, "missing access_token"))?;

        tracing::debug!(expires_in = ?body.expires_in, "Received refreshed token");
        Ok(ExternalToken::new(access_token, body.expires_in))
    }

    #[tracing::instrument(skip(self, token))]
    async fn validate(&self, token: &SecretString) -> Result<String> {
        let response = self
            .client
            .get(join_url(&self.config.instagram_base_url, "me"))
            .query(&[("fields", "id"), ("access_token", token.expose_secret())])
            .send()
            .await
            .map_err(|e| ProviderError::from_http(VALIDATE, e.into()))?;

        let body: IdentityResponse =
            read_json(response).await.map_err(|e| ProviderError::from_http(VALIDATE, e))?;

        // Graph ids are strings, but accept numeric ids too.
        let subject = match body.id {
            Some(serde_json::Value::String(id)) => id,
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };

        if subject.trim().is_empty() {
            return Err(ProviderError::invalid_response(VALIDATE, "response has no subject id"));
        }
        Ok(subject)
    }

    fn name(&self) -> &'static str {
        "graph"
    }
}
