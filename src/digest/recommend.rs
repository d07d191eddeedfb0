//! Prompt construction and email body rendering.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::llm::LanguageModel;
use super::{DigestError, Result};

pub const SYSTEM_PROMPT: &str = "You are an assistant that summarizes social media performance \
from tabular data and suggests 3 post drafts with captions and hashtags. Provide your response \
in Markdown.";

pub const EMAIL_SUBJECT: &str = "Weekly Social Summary — Pie Guys";

/// User prompt embedding the insights document.
pub fn user_prompt(insights_json: &str) -> String {
    format!(
        "Here is the last week's posts:\n\n{}\n\nPlease summarize top performing themes, \
         3 suggested posts (caption + hashtags), and include evidence lines pointing to the \
         original post IDs.",
        insights_json
    )
}

/// Markdown email body around a recommendation.
pub fn render_email_body(recommendation: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "# Weekly Social Summary\n\n{}\n\n---\n\n*Generated: {}*",
        recommendation.trim(),
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Turns insights into post recommendations via a [`LanguageModel`].
#[derive(Clone)]
pub struct RecommendationGenerator {
    model: Arc<dyn LanguageModel>,
}

impl RecommendationGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub async fn generate(&self, insights: &Value) -> Result<String> {
        // An absent document is sent as an empty list.
        let document = match insights {
            Value::Null => Value::Array(Vec::new()),
            other => other.clone(),
        };
        let pretty = serde_json::to_string_pretty(&document)
            .map_err(|e| DigestError::Insights(e.to_string()))?;

        self.model.complete(SYSTEM_PROMPT, &user_prompt(&pretty)).await
    }
}
