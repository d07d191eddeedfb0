//! Language model client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{DigestError, Result};
use crate::secrets::{extract_secret_field, SecretStore};
use crate::utils::{build_http_client, join_url, read_json};

/// Keys the stored API key may live under, in priority order.
const API_KEY_KEYS: [&str; 3] = ["api_key", "key", "OPENAI_API_KEY"];

/// Text completion over a system instruction and a user prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    /// Secret holding the API key.
    pub api_key_secret_name: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_secret_name: "OPEN_AI_SECRET_KEY".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

impl ResponsesBody {
    /// `output_text` if present, else every `output_text` content part joined.
    fn text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(text.to_string());
        }

        let joined: String = self
            .output
            .iter()
            .flat_map(|item| &item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect();

        (!joined.trim().is_empty()).then_some(joined)
    }
}

/// Client for the OpenAI Responses API.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    store: Arc<dyn SecretStore>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
        let client = build_http_client(config.timeout)
            .map_err(|e| DigestError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config, store })
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    #[tracing::instrument(skip_all, fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let raw = self.store.get_current_value(&self.config.api_key_secret_name).await?;
        let api_key = extract_secret_field(&raw, &API_KEY_KEYS)?;

        let request =
            ResponsesRequest { model: &self.config.model, instructions: system, input: prompt };
        let response = self
            .client
            .post(join_url(&self.config.base_url, "responses"))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| DigestError::language_model(e.into()))?;

        let body: ResponsesBody = read_json(response).await.map_err(DigestError::language_model)?;

        if let Some(error) = &body.error {
            let message = error.message.as_deref().unwrap_or("unknown error");
            return Err(DigestError::LanguageModel(format!("API error: {}", message)));
        }

        let text = body
            .text()
            .ok_or_else(|| DigestError::LanguageModel("no recommendation returned".to_string()))?;

        tracing::debug!(response_len = text.len(), "Language model responded");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

const STUB_RESPONSE: &str = "\
## Top Performing Content
Video outperformed photos this week:
- Behind-the-scenes crust testing (17900333333333333): 223 engagements, 985 reach
- Blueberry crumble return (17900222222222222): 163 engagements, 721 reach
- Caramel apple launch (17900111111111111): 142 engagements, 612 reach

## Suggested Posts

### 1. Recipe teaser reel
**Caption:** Something new is baking. Guess next week's special in the comments!
**Hashtags:** #PieGuys #ComingSoon #BakersLife

### 2. Limited run reminder
**Caption:** Blueberry crumble is only here for two more weeks. Grab one this weekend.
**Hashtags:** #PieGuys #BlueberryPie #LimitedEdition

### 3. Customer spotlight
**Caption:** Share your pie moments with #PieGuys and we'll feature our favourites.
**Hashtags:** #PieGuys #CustomerLove #SupportLocal

*Stubbed response*
";

/// Returns canned Markdown without calling any API.
#[derive(Debug, Clone, Default)]
pub struct StubLanguageModel;

impl StubLanguageModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModel for StubLanguageModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        tracing::info!(system_len = system.len(), prompt_len = prompt.len(), "Using stubbed model");
        Ok(STUB_RESPONSE.to_string())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::InMemorySecretStore;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer, stored_key: &str) -> OpenAiClient {
        let store = InMemorySecretStore::new();
        store.insert_current("OPEN_AI_SECRET_KEY", stored_key).await;
        let config = OpenAiConfig { base_url: server.uri(), ..Default::default() };
        OpenAiClient::new(config, Arc::new(store)).unwrap()
    }

    #[test]
    fn test_text_prefers_output_text() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({
            "output_text": "direct",
            "output": [{"content": [{"type": "output_text", "text": "nested"}]}]
        }))
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("direct"));
    }

    #[test]
    fn test_text_joins_output_parts() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "# Summary\n"},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "Posts"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("# Summary\nPosts"));
    }

    #[test]
    fn test_empty_output_has_no_text() {
        assert_eq!(ResponsesBody::default().text(), None);
    }

    #[tokio::test]
    async fn test_complete_sends_model_instructions_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "instructions": "system text",
                "input": "user text"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"output_text": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, r#"{"api_key":"sk-test"}"#).await;
        assert_eq!(client.complete("system text", "user text").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_error_object_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"message": "model overloaded"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "sk-raw").await;
        let err = client.complete("s", "p").await.unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = client_for(&server, "sk-raw").await;
        let err = client.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, DigestError::LanguageModel(_)));
    }
}
