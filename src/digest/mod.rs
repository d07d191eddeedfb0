//! # Weekly Digest
//!
//! Insight-and-recommend workflow: fetch recent post performance, ask a
//! language model for a summary and post drafts, and email the result.
//! Every stage is a capability trait with a network-backed and a stub
//! implementation, chosen at construction time.
//!
//! Any failure aborts the run before the email is sent; nothing partial is
//! delivered and no error notification is generated.

pub mod email;
pub mod insights;
pub mod llm;
pub mod recommend;

pub use email::{
    EmailMessage, NotificationSender, SmtpConfig, SmtpEmailSender, SmtpSecurity, StubEmailSender,
};
pub use insights::{GraphInsightsClient, GraphInsightsConfig, InsightsSource, StubInsightsSource};
pub use llm::{LanguageModel, OpenAiClient, OpenAiConfig, StubLanguageModel};
pub use recommend::{RecommendationGenerator, EMAIL_SUBJECT};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

use crate::secrets::SecretsError;
use crate::utils::HttpFailure;

/// Result type for the digest workflow.
pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Insights fetch failed: {0}")]
    Insights(String),

    #[error("Language model request failed: {0}")]
    LanguageModel(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid email message: {0}")]
    InvalidMessage(String),

    #[error("Secret lookup failed: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Digest configuration error: {0}")]
    Config(String),
}

impl DigestError {
    pub(crate) fn insights(failure: HttpFailure) -> Self {
        Self::Insights(failure.to_string())
    }

    pub(crate) fn language_model(failure: HttpFailure) -> Self {
        Self::LanguageModel(failure.to_string())
    }

    /// Workflow stage the error came from.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Insights(_) => "insights",
            Self::LanguageModel(_) => "recommendation",
            Self::Delivery(_) | Self::InvalidMessage(_) => "email",
            Self::Secrets(_) => "secrets",
            Self::Config(_) => "config",
        }
    }
}

/// Sender and recipient of the digest email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    pub to: String,
    pub from: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    pub posts: usize,
    pub lookback_days: u32,
    pub sent_to: String,
    pub generated_at: DateTime<Utc>,
}

/// Runs fetch → recommend → send.
pub struct DigestWorkflow {
    insights: Arc<dyn InsightsSource>,
    generator: RecommendationGenerator,
    sender: Arc<dyn NotificationSender>,
    recipients: Recipients,
    lookback_days: u32,
}

impl DigestWorkflow {
    pub fn new(
        insights: Arc<dyn InsightsSource>,
        generator: RecommendationGenerator,
        sender: Arc<dyn NotificationSender>,
        recipients: Recipients,
        lookback_days: u32,
    ) -> Self {
        Self { insights, generator, sender, recipients, lookback_days }
    }

    /// Run once. `lookback_days` overrides the configured window.
    pub async fn run(&self, lookback_days: Option<u32>) -> Result<DigestReport> {
        let days = lookback_days.unwrap_or(self.lookback_days);
        let span = crate::digest_span!(days, self.insights.name(), self.sender.name());

        let result = self.run_inner(days).instrument(span.clone()).await;
        if let Err(err) = &result {
            span.in_scope(|| {
                tracing::error!(error = %err, stage = err.stage(), "Digest run failed");
            });
        }
        result
    }

    async fn run_inner(&self, days: u32) -> Result<DigestReport> {
        let insights = self.insights.fetch_insights(days).await?;
        let posts = insights::post_count(&insights);

        let recommendation = self.generator.generate(&insights).await?;
        tracing::info!(
            model = self.generator.model_name(),
            chars = recommendation.len(),
            "Recommendation generated"
        );

        let generated_at = Utc::now();
        let message = EmailMessage::text(
            &self.recipients.to,
            &self.recipients.from,
            EMAIL_SUBJECT,
            recommend::render_email_body(&recommendation, generated_at),
        );
        self.sender.send(&message).await?;

        tracing::info!(posts, to = %self.recipients.to, "Digest delivered");
        Ok(DigestReport {
            posts,
            lookback_days: days,
            sent_to: self.recipients.to.clone(),
            generated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(sender: StubEmailSender) -> DigestWorkflow {
        DigestWorkflow::new(
            Arc::new(StubInsightsSource::new()),
            RecommendationGenerator::new(Arc::new(StubLanguageModel::new())),
            Arc::new(sender),
            Recipients { to: "owner@example.com".into(), from: "digest@example.com".into() },
            7,
        )
    }

    #[tokio::test]
    async fn test_stubbed_run_sends_one_email() {
        let sender = StubEmailSender::new();
        let report = workflow(sender.clone()).run(None).await.unwrap();

        assert_eq!(report.posts, 3);
        assert_eq!(report.lookback_days, 7);

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, EMAIL_SUBJECT);
        let body = sent[0].text.as_deref().unwrap();
        assert!(body.starts_with("# Weekly Social Summary\n\n"));
        assert!(body.contains("*Generated: "));
    }

    #[tokio::test]
    async fn test_days_override() {
        let report = workflow(StubEmailSender::new()).run(Some(14)).await.unwrap();
        assert_eq!(report.lookback_days, 14);
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(DigestError::Delivery("x".into()).stage(), "email");
        assert_eq!(DigestError::Insights("x".into()).stage(), "insights");
    }
}
