//! Email notification delivery.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use super::{DigestError, Result};
use crate::secrets::SecretString;
use crate::utils::truncate;

/// An outgoing email. `to` and `from` are required; at least one body part
/// should be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl EmailMessage {
    /// Plain-text message.
    pub fn text(
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            subject: subject.into(),
            text: Some(body.into()),
            html: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Reject messages without both addresses.
    pub fn ensure_addressed(&self) -> Result<()> {
        if self.to.trim().is_empty() || self.from.trim().is_empty() {
            return Err(DigestError::InvalidMessage(
                "email must include both 'to' and 'from'".to_string(),
            ));
        }
        Ok(())
    }

    /// First `max` bytes of whichever body is present.
    pub fn preview(&self, max: usize) -> String {
        let body = self.text.as_deref().or(self.html.as_deref()).unwrap_or_default();
        truncate(body, max)
    }
}

/// Delivers a finished notification.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Upgrade a plain connection with STARTTLS (port 587).
    #[default]
    StartTls,
    /// TLS from the first byte (port 465).
    Tls,
    /// No encryption. Local relays only.
    None,
}

impl SmtpSecurity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTls => "starttls",
            Self::Tls => "tls",
            Self::None => "none",
        }
    }
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" | "smtps" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!(
                "Unknown SMTP security '{}'. Expected starttls, tls or none",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

type Transport = AsyncSmtpTransport<Tokio1Executor>;

fn relay_error(err: lettre::transport::smtp::Error) -> DigestError {
    DigestError::Config(format!("invalid SMTP relay: {}", err))
}

/// Sends email through an SMTP relay.
pub struct SmtpEmailSender {
    mailer: Transport,
    host: String,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.security {
            SmtpSecurity::StartTls => Transport::starttls_relay(&config.host).map_err(relay_error)?,
            SmtpSecurity::Tls => Transport::relay(&config.host).map_err(relay_error)?,
            SmtpSecurity::None => Transport::builder_dangerous(&config.host),
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self { mailer: builder.build(), host: config.host.clone() })
    }
}

fn parse_mailbox(field: &str, address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| DigestError::InvalidMessage(format!("invalid {} address: {}", field, e)))
}

/// Build the MIME message: a single part, or text+html alternatives.
pub fn build_message(message: &EmailMessage) -> Result<Message> {
    message.ensure_addressed()?;

    let builder = Message::builder()
        .from(parse_mailbox("from", &message.from)?)
        .to(parse_mailbox("to", &message.to)?)
        .subject(message.subject.clone());

    let built = match (&message.text, &message.html) {
        (Some(text), Some(html)) => {
            builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
        (None, Some(html)) => builder.singlepart(
            SinglePart::builder().header(ContentType::TEXT_HTML).body(html.clone()),
        ),
        (text, None) => builder.singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone().unwrap_or_default()),
        ),
    };

    built.map_err(|e| DigestError::InvalidMessage(format!("failed to build email: {}", e)))
}

#[async_trait]
impl NotificationSender for SmtpEmailSender {
    #[tracing::instrument(skip_all, fields(relay = %self.host, to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = build_message(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;

        tracing::info!(subject = %message.subject, "Email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Logs messages instead of sending them and keeps a copy of each.
#[derive(Debug, Clone, Default)]
pub struct StubEmailSender {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl StubEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for StubEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        message.ensure_addressed()?;

        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            preview = %message.preview(100),
            "Stubbed email send (not delivered)"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage::text("owner@example.com", "digest@example.com", "Weekly", "# Summary")
    }

    #[test]
    fn test_security_parsing() {
        assert_eq!("STARTTLS".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::StartTls);
        assert_eq!("smtps".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::Tls);
        assert!("ssl3".parse::<SmtpSecurity>().is_err());
    }

    #[test]
    fn test_missing_address_is_rejected() {
        let mut msg = message();
        msg.from = String::new();
        assert!(matches!(msg.ensure_addressed(), Err(DigestError::InvalidMessage(_))));
        assert!(build_message(&msg).is_err());
    }

    #[test]
    fn test_build_plain_message() {
        let built = build_message(&message()).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("To: owner@example.com"));
        assert!(raw.contains("Subject: Weekly"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn test_build_alternative_message() {
        let built = build_message(&message().with_html("<h1>Summary</h1>")).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let mut msg = message();
        msg.to = "not an address".to_string();
        assert!(matches!(build_message(&msg), Err(DigestError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn test_smtp_sender_builds_without_connecting() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            security: SmtpSecurity::None,
            username: None,
            password: None,
        };
        let sender = SmtpEmailSender::new(&config).unwrap();
        assert_eq!(sender.name(), "smtp");
    }

    #[tokio::test]
    async fn test_stub_records_messages() {
        let sender = StubEmailSender::new();
        sender.send(&message()).await.unwrap();
        assert_eq!(sender.sent(), vec![message()]);
    }
}
