//! Social insights source.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{DigestError, Result};
use crate::secrets::{extract_secret_field, SecretStore};
use crate::utils::{build_http_client, join_url, read_json};

/// Media fields requested for each post.
pub const MEDIA_FIELDS: &str = "id,caption,media_type,media_url,timestamp,like_count,comments_count";

/// Keys the stored token may live under, in priority order.
const TOKEN_KEYS: [&str; 3] = ["access_token", "current_access_token", "key"];

const FIXTURE: &str = include_str!("fixtures/insights.json");

/// Source of recent post performance.
#[async_trait]
pub trait InsightsSource: Send + Sync {
    /// Posts published in the last `lookback_days` days, as returned upstream.
    async fn fetch_insights(&self, lookback_days: u32) -> Result<Value>;

    fn name(&self) -> &'static str;
}

/// Inclusive `since`/`until` dates (`YYYY-MM-DD`) ending at `now`.
pub fn lookback_window(now: DateTime<Utc>, lookback_days: u32) -> (String, String) {
    let since = now - ChronoDuration::days(i64::from(lookback_days));
    (since.format("%Y-%m-%d").to_string(), now.format("%Y-%m-%d").to_string())
}

/// Number of posts in an insights document (`data` array).
pub fn post_count(insights: &Value) -> usize {
    insights.get("data").and_then(Value::as_array).map_or(0, Vec::len)
}

#[derive(Debug, Clone)]
pub struct GraphInsightsConfig {
    pub graph_base_url: String,
    pub graph_api_version: String,
    pub business_id: String,
    /// Secret holding the Graph access token.
    pub token_secret_name: String,
    pub timeout: Duration,
}

/// Reads media for an Instagram business account from the Graph API.
///
/// The access token is read through the secret store on every fetch, so a
/// rotated token is picked up once the store's cache entry expires.
pub struct GraphInsightsClient {
    client: Client,
    config: GraphInsightsConfig,
    store: Arc<dyn SecretStore>,
}

impl GraphInsightsClient {
    pub fn new(config: GraphInsightsConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
        if config.business_id.trim().is_empty() {
            return Err(DigestError::Config("IG business id is required".to_string()));
        }
        let client = build_http_client(config.timeout)
            .map_err(|e| DigestError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config, store })
    }
}

#[async_trait]
impl InsightsSource for GraphInsightsClient {
    #[tracing::instrument(skip(self), fields(business_id = %self.config.business_id))]
    async fn fetch_insights(&self, lookback_days: u32) -> Result<Value> {
        let raw = self.store.get_current_value(&self.config.token_secret_name).await?;
        let token = extract_secret_field(&raw, &TOKEN_KEYS)?;

        let (since, until) = lookback_window(Utc::now(), lookback_days);
        let path = format!("{}/{}/media", self.config.graph_api_version, self.config.business_id);

        let response = self
            .client
            .get(join_url(&self.config.graph_base_url, &path))
            .query(&[
                ("fields", MEDIA_FIELDS),
                ("since", since.as_str()),
                ("until", until.as_str()),
                ("access_token", token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| DigestError::insights(e.into()))?;

        let insights: Value = read_json(response).await.map_err(DigestError::insights)?;

        tracing::info!(
            posts = post_count(&insights),
            since = %since,
            until = %until,
            "Fetched insights"
        );
        Ok(insights)
    }

    fn name(&self) -> &'static str {
        "graph"
    }
}

/// Serves a bundled insights document.
#[derive(Debug, Clone, Default)]
pub struct StubInsightsSource;

impl StubInsightsSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InsightsSource for StubInsightsSource {
    async fn fetch_insights(&self, lookback_days: u32) -> Result<Value> {
        tracing::info!(lookback_days, "Using stubbed insights");
        serde_json::from_str(FIXTURE)
            .map_err(|e| DigestError::Insights(format!("bundled fixture is invalid: {}", e)))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lookback_window() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 8, 0, 0).unwrap();
        assert_eq!(lookback_window(now, 7), ("2025-09-28".to_string(), "2025-10-05".to_string()));
        assert_eq!(lookback_window(now, 0), ("2025-10-05".to_string(), "2025-10-05".to_string()));
    }

    #[tokio::test]
    async fn test_stub_fixture_has_posts() {
        let insights = StubInsightsSource::new().fetch_insights(7).await.unwrap();
        assert_eq!(post_count(&insights), 3);
        assert_eq!(insights["data"][2]["media_type"], "VIDEO");
    }

    #[test]
    fn test_post_count_tolerates_other_shapes() {
        assert_eq!(post_count(&serde_json::json!({})), 0);
        assert_eq!(post_count(&serde_json::json!({"data": "x"})), 0);
    }
}
