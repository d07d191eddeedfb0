//! # Configuration Settings
//!
//! Defines the configuration structure for social-digest. Every value comes
//! from an environment variable; see [`AppConfig::from_lookup`].

use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::digest::SmtpSecurity;
use crate::errors::{Error, Result};
use crate::provider::GrantKind;
use crate::secrets::{SecretStoreType, SecretString};

/// Main application configuration
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    /// Secret store configuration
    #[validate(nested)]
    pub secrets: SecretStoreConfig,

    /// Token provider configuration
    #[validate(nested)]
    pub provider: ProviderConfig,

    /// Insights and language model configuration
    #[validate(nested)]
    pub digest: DigestConfig,

    /// Email delivery configuration
    #[validate(nested)]
    pub email: EmailConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Stub selection flags
    pub stubs: StubFlags,

    /// Timeout applied to every outbound HTTP call
    #[validate(range(
        min = 1,
        max = 300,
        message = "HTTP timeout must be between 1 and 300 seconds"
    ))]
    pub http_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secrets: SecretStoreConfig::default(),
            provider: ProviderConfig::default(),
            digest: DigestConfig::default(),
            email: EmailConfig::default(),
            observability: ObservabilityConfig::default(),
            stubs: StubFlags::default(),
            http_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let defaults = Self::default();

        let config = Self {
            secrets: SecretStoreConfig {
                backend: env.parsed("SECRET_STORE_BACKEND", defaults.secrets.backend)?,
                aws_region: env.optional("AWS_REGION"),
                aws_endpoint_url: env.optional("AWS_ENDPOINT_URL"),
                cache_ttl_seconds: env
                    .number("SECRET_CACHE_TTL_SECONDS", defaults.secrets.cache_ttl_seconds),
                ig_token_secret_name: env
                    .string("IG_TOKEN_SECRET_NAME", &defaults.secrets.ig_token_secret_name),
            },
            provider: ProviderConfig {
                grant: env.parsed("TOKEN_GRANT", defaults.provider.grant)?,
                instagram_base_url: env
                    .string("INSTAGRAM_API_BASE_URL", &defaults.provider.instagram_base_url),
                graph_base_url: env.string("GRAPH_API_BASE_URL", &defaults.provider.graph_base_url),
                graph_api_version: env
                    .string("GRAPH_API_VERSION", &defaults.provider.graph_api_version),
                fb_app_id: env.optional("FB_APP_ID"),
                fb_app_secret: env.optional("FB_APP_SECRET").map(SecretString::from),
            },
            digest: DigestConfig {
                ig_business_id: env.optional("IG_BUSINESS_ID"),
                lookback_days: env.number("INSIGHTS_LOOKBACK_DAYS", defaults.digest.lookback_days),
                openai_base_url: env.string("OPENAI_BASE_URL", &defaults.digest.openai_base_url),
                openai_model: env.string("OPENAI_MODEL", &defaults.digest.openai_model),
                openai_secret_name: env
                    .string("OPEN_AI_SECRET_NAME", &defaults.digest.openai_secret_name),
            },
            email: EmailConfig {
                to_email: env.optional("TO_EMAIL"),
                from_email: env.optional("FROM_EMAIL"),
                smtp_host: env.optional("SMTP_HOST"),
                smtp_port: env.number("SMTP_PORT", defaults.email.smtp_port),
                smtp_security: env.parsed("SMTP_SECURITY", defaults.email.smtp_security)?,
                smtp_username: env.optional("SMTP_USERNAME"),
                smtp_password_secret_name: env.optional("SMTP_PASSWORD_SECRET_NAME"),
            },
            observability: ObservabilityConfig {
                service_name: env.string("SERVICE_NAME", &defaults.observability.service_name),
                environment: env.string("ENVIRONMENT", &defaults.observability.environment),
                log_level: env.string("LOG_LEVEL", &defaults.observability.log_level),
                json_logging: env.flag("LOG_JSON", defaults.observability.json_logging),
            },
            stubs: StubFlags {
                insights: env.flag("USE_STUB_IG", false),
                llm: env.flag("USE_STUB_LLM", false),
                email: env.flag("USE_STUB_EMAIL", false),
            },
            http_timeout_seconds: env.number("HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Cross-field checks the derive cannot express.
    fn validate_custom(&self) -> Result<()> {
        if self.provider.grant == GrantKind::FbExchangeToken
            && !self.stubs.insights
            && (self.provider.fb_app_id.is_none() || self.provider.fb_app_secret.is_none())
        {
            return Err(Error::config(
                "TOKEN_GRANT=fb_exchange_token requires FB_APP_ID and FB_APP_SECRET",
            ));
        }

        if self.email.smtp_username.is_some() != self.email.smtp_password_secret_name.is_some() {
            return Err(Error::config(
                "SMTP_USERNAME and SMTP_PASSWORD_SECRET_NAME must be set together",
            ));
        }

        Ok(())
    }

    /// Settings only the digest run needs.
    pub fn validate_for_digest(&self) -> Result<()> {
        if self.email.to_email.is_none() || self.email.from_email.is_none() {
            return Err(Error::config("TO_EMAIL and FROM_EMAIL are required"));
        }

        if !self.stubs.insights && self.digest.ig_business_id.is_none() {
            return Err(Error::config("IG_BUSINESS_ID is required unless USE_STUB_IG=true"));
        }

        if !self.stubs.email && self.email.smtp_host.is_none() {
            return Err(Error::config("SMTP_HOST is required unless USE_STUB_EMAIL=true"));
        }

        Ok(())
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Validate)]
pub struct SecretStoreConfig {
    /// Which store variant to construct
    pub backend: SecretStoreType,

    /// AWS region (SDK detection when unset)
    pub aws_region: Option<String>,

    /// Custom endpoint (LocalStack)
    #[validate(url(message = "AWS_ENDPOINT_URL must be a valid URL"))]
    pub aws_endpoint_url: Option<String>,

    /// How long readers may serve a cached current value
    #[validate(range(max = 86400, message = "Cache TTL must be at most one day"))]
    pub cache_ttl_seconds: u64,

    /// Secret holding the Instagram access token
    #[validate(length(min = 1, message = "IG token secret name cannot be empty"))]
    pub ig_token_secret_name: String,
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            backend: SecretStoreType::Aws,
            aws_region: None,
            aws_endpoint_url: None,
            cache_ttl_seconds: 300,
            ig_token_secret_name: "INSTAGRAM_SECRET_KEY".to_string(),
        }
    }
}

impl SecretStoreConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Token provider configuration
#[derive(Debug, Clone, Validate)]
pub struct ProviderConfig {
    pub grant: GrantKind,

    #[validate(url(message = "INSTAGRAM_API_BASE_URL must be a valid URL"))]
    pub instagram_base_url: String,

    #[validate(url(message = "GRAPH_API_BASE_URL must be a valid URL"))]
    pub graph_base_url: String,

    #[validate(length(min = 1, message = "Graph API version cannot be empty"))]
    pub graph_api_version: String,

    pub fb_app_id: Option<String>,

    pub fb_app_secret: Option<SecretString>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            grant: GrantKind::IgRefreshToken,
            instagram_base_url: "https://graph.instagram.com".to_string(),
            graph_base_url: "https://graph.facebook.com".to_string(),
            graph_api_version: "v16.0".to_string(),
            fb_app_id: None,
            fb_app_secret: None,
        }
    }
}

/// Insights and language model configuration
#[derive(Debug, Clone, Validate)]
pub struct DigestConfig {
    pub ig_business_id: Option<String>,

    #[validate(range(min = 1, max = 90, message = "Lookback must be between 1 and 90 days"))]
    pub lookback_days: u32,

    #[validate(url(message = "OPENAI_BASE_URL must be a valid URL"))]
    pub openai_base_url: String,

    #[validate(length(min = 1, message = "Model name cannot be empty"))]
    pub openai_model: String,

    #[validate(length(min = 1, message = "OpenAI secret name cannot be empty"))]
    pub openai_secret_name: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            ig_business_id: None,
            lookback_days: 7,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_secret_name: "OPEN_AI_SECRET_KEY".to_string(),
        }
    }
}

/// Email delivery configuration
#[derive(Debug, Clone, Validate)]
pub struct EmailConfig {
    #[validate(email(message = "TO_EMAIL must be an email address"))]
    pub to_email: Option<String>,

    #[validate(email(message = "FROM_EMAIL must be an email address"))]
    pub from_email: Option<String>,

    pub smtp_host: Option<String>,

    #[validate(range(min = 1, message = "SMTP port must be between 1 and 65535"))]
    pub smtp_port: u16,

    pub smtp_security: SmtpSecurity,

    pub smtp_username: Option<String>,

    /// Secret holding the SMTP password
    pub smtp_password_secret_name: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            to_email: None,
            from_email: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_security: SmtpSecurity::StartTls,
            smtp_username: None,
            smtp_password_secret_name: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to every event
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Deployment environment attached to every event
    pub environment: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "social-digest".to_string(),
            environment: "production".to_string(),
            log_level: "info".to_string(),
            json_logging: true,
        }
    }
}

/// Which collaborators run as offline stubs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubFlags {
    /// Insights and token provider
    pub insights: bool,
    pub llm: bool,
    pub email: bool,
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn number<T: FromStr>(&self, key: &str, default: T) -> T {
        self.optional(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.optional(key).map_or(default, |v| matches!(v.to_lowercase().as_str(), "true" | "1"))
    }

    /// Unlike numbers, a misspelled variant name is an error.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().map_err(|e| Error::config(format!("{}: {}", key, e))),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.secrets.backend, SecretStoreType::Aws);
        assert_eq!(config.secrets.cache_ttl_seconds, 300);
        assert_eq!(config.secrets.ig_token_secret_name, "INSTAGRAM_SECRET_KEY");
        assert_eq!(config.provider.grant, GrantKind::IgRefreshToken);
        assert_eq!(config.provider.graph_api_version, "v16.0");
        assert_eq!(config.digest.openai_model, "gpt-4o");
        assert_eq!(config.digest.lookback_days, 7);
        assert_eq!(config.email.smtp_port, 587);
        assert!(config.observability.json_logging);
        assert_eq!(config.stubs, StubFlags::default());
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SECRET_STORE_BACKEND", "memory"),
            ("SECRET_CACHE_TTL_SECONDS", "0"),
            ("USE_STUB_IG", "true"),
            ("USE_STUB_EMAIL", "TRUE"),
            ("LOG_JSON", "false"),
            ("INSIGHTS_LOOKBACK_DAYS", "14"),
        ])
        .unwrap();
        assert_eq!(config.secrets.backend, SecretStoreType::Memory);
        assert_eq!(config.secrets.cache_ttl(), Duration::ZERO);
        assert!(config.stubs.insights && config.stubs.email && !config.stubs.llm);
        assert!(!config.observability.json_logging);
        assert_eq!(config.digest.lookback_days, 14);
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let err = load(&[("SECRET_STORE_BACKEND", "vault")]).unwrap_err();
        assert!(err.to_string().contains("SECRET_STORE_BACKEND"));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        assert!(load(&[("TO_EMAIL", "not-an-email")]).is_err());
        assert!(load(&[("OPENAI_BASE_URL", "not a url")]).is_err());
        assert!(load(&[("INSIGHTS_LOOKBACK_DAYS", "365")]).is_err());
        assert!(load(&[("HTTP_TIMEOUT_SECONDS", "0")]).is_err());
    }

    #[test]
    fn test_fb_grant_needs_app_credentials() {
        assert!(load(&[("TOKEN_GRANT", "fb_exchange_token")]).is_err());

        let config = load(&[
            ("TOKEN_GRANT", "fb_exchange_token"),
            ("FB_APP_ID", "123"),
            ("FB_APP_SECRET", "shh"),
        ])
        .unwrap();
        assert_eq!(config.provider.fb_app_secret.unwrap().expose_secret(), "shh");
    }

    #[test]
    fn test_smtp_credentials_come_in_pairs() {
        assert!(load(&[("SMTP_USERNAME", "mailer")]).is_err());
        assert!(load(&[
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD_SECRET_NAME", "SMTP_PASSWORD")
        ])
        .is_ok());
    }

    #[test]
    fn test_digest_requirements() {
        let config = load(&[]).unwrap();
        assert!(config.validate_for_digest().is_err());

        let config = load(&[
            ("TO_EMAIL", "owner@example.com"),
            ("FROM_EMAIL", "digest@example.com"),
            ("USE_STUB_IG", "true"),
            ("USE_STUB_EMAIL", "true"),
        ])
        .unwrap();
        assert!(config.validate_for_digest().is_ok());

        let config = load(&[
            ("TO_EMAIL", "owner@example.com"),
            ("FROM_EMAIL", "digest@example.com"),
            ("IG_BUSINESS_ID", "1784"),
        ])
        .unwrap();
        let err = config.validate_for_digest().unwrap_err();
        assert!(err.to_string().contains("SMTP_HOST"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("OPENAI_MODEL", "  "), ("IG_BUSINESS_ID", "")]).unwrap();
        assert_eq!(config.digest.openai_model, "gpt-4o");
        assert_eq!(config.digest.ig_business_id, None);
    }
}
