//! Startup wiring for both entry points.
//!
//! Builds the secret store selected by `SECRET_STORE_BACKEND`, the token
//! provider, and the digest collaborators (real or stubbed per the
//! `USE_STUB_*` flags) from a validated [`AppConfig`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::digest::{
    DigestWorkflow, GraphInsightsClient, GraphInsightsConfig, InsightsSource, LanguageModel,
    NotificationSender, OpenAiClient, OpenAiConfig, RecommendationGenerator, Recipients,
    SmtpConfig, SmtpEmailSender, StubEmailSender, StubInsightsSource, StubLanguageModel,
};
use crate::errors::{Error, Result};
use crate::provider::{
    GrantKind, GraphTokenProvider, GraphTokenProviderConfig, RefreshGrant, StubTokenProvider,
    TokenProvider,
};
use crate::rotation::RotationWorkflow;
use crate::secrets::{
    extract_secret_field, CachedSecretStore, EnvVarSecretStore, InMemorySecretStore, SecretStore,
    SecretStoreType,
};

/// Keys an SMTP password may be stored under.
const SMTP_PASSWORD_KEYS: [&str; 3] = ["password", "smtp_password", "key"];

/// The configured secret store.
#[derive(Clone)]
pub struct SecretBackend {
    pub store: Arc<dyn SecretStore>,
    /// Present for the `memory` backend so a local run can stage versions.
    pub memory: Option<InMemorySecretStore>,
}

impl SecretBackend {
    pub fn from_memory(memory: InMemorySecretStore) -> Self {
        Self { store: Arc::new(memory.clone()), memory: Some(memory) }
    }
}

/// Secret names the process reads, in the order they are seeded.
fn known_secret_names(config: &AppConfig) -> Vec<&str> {
    let mut names = vec![
        config.secrets.ig_token_secret_name.as_str(),
        config.digest.openai_secret_name.as_str(),
    ];
    if let Some(name) = config.email.smtp_password_secret_name.as_deref() {
        names.push(name);
    }
    names
}

/// Copy `SOCIAL_DIGEST_SECRET_*` variables into the store as CURRENT versions.
///
/// Returns how many secrets were seeded.
pub async fn seed_from_env(store: &InMemorySecretStore, secret_ids: &[&str]) -> usize {
    let env = EnvVarSecretStore::new();
    let mut seeded = 0;
    for secret_id in secret_ids {
        match env.lookup(secret_id) {
            Some(value) => {
                store.insert_current(secret_id, value).await;
                seeded += 1;
            }
            None => warn!(
                secret_id = %secret_id,
                variable = %EnvVarSecretStore::env_var_name(secret_id),
                "No seed value for in-memory secret"
            ),
        }
    }
    seeded
}

/// Build the secret store selected by configuration.
pub async fn build_secret_backend(config: &AppConfig) -> Result<SecretBackend> {
    let backend = config.secrets.backend;
    let built = match backend {
        SecretStoreType::Aws => build_aws_backend(config).await?,
        SecretStoreType::Memory => {
            let memory = InMemorySecretStore::new();
            let seeded = seed_from_env(&memory, &known_secret_names(config)).await;
            info!(seeded, "Seeded in-memory secret store from environment");
            SecretBackend::from_memory(memory)
        }
        SecretStoreType::Env => {
            SecretBackend { store: Arc::new(EnvVarSecretStore::new()), memory: None }
        }
    };

    info!(backend = %backend, "Secret store ready");
    Ok(built)
}

#[cfg(feature = "aws")]
async fn build_aws_backend(config: &AppConfig) -> Result<SecretBackend> {
    use crate::secrets::{AwsSecretStore, AwsSecretStoreConfig};

    let aws = AwsSecretStore::new(AwsSecretStoreConfig {
        region: config.secrets.aws_region.clone(),
        endpoint_url: config.secrets.aws_endpoint_url.clone(),
    })
    .await?;
    Ok(SecretBackend { store: Arc::new(aws), memory: None })
}

#[cfg(not(feature = "aws"))]
async fn build_aws_backend(_config: &AppConfig) -> Result<SecretBackend> {
    Err(Error::config("SECRET_STORE_BACKEND=aws requires the `aws` feature"))
}

/// Token provider: the Graph API, or the stub when `USE_STUB_IG` is set.
///
/// The stub is refused against AWS Secrets Manager so fake tokens never reach
/// a live secret.
pub fn build_token_provider(config: &AppConfig) -> Result<Arc<dyn TokenProvider>> {
    if config.stubs.insights {
        if config.secrets.backend == SecretStoreType::Aws {
            return Err(Error::config(
                "USE_STUB_IG=true cannot rotate secrets in SECRET_STORE_BACKEND=aws",
            ));
        }
        warn!("USE_STUB_IG is set; rotation will mint fake tokens");
        return Ok(Arc::new(StubTokenProvider::new()));
    }

    let grant = match config.provider.grant {
        GrantKind::IgRefreshToken => RefreshGrant::IgRefreshToken,
        GrantKind::FbExchangeToken => {
            match (&config.provider.fb_app_id, &config.provider.fb_app_secret) {
                (Some(app_id), Some(app_secret)) => RefreshGrant::FbExchangeToken {
                    app_id: app_id.clone(),
                    app_secret: app_secret.clone(),
                },
                _ => {
                    return Err(Error::config(
                        "fb_exchange_token requires FB_APP_ID and FB_APP_SECRET",
                    ))
                }
            }
        }
    };

    let provider = GraphTokenProvider::new(GraphTokenProviderConfig {
        instagram_base_url: config.provider.instagram_base_url.clone(),
        graph_base_url: config.provider.graph_base_url.clone(),
        graph_api_version: config.provider.graph_api_version.clone(),
        grant,
        timeout: config.http_timeout(),
    })?;
    Ok(Arc::new(provider))
}

/// Rotation workflow over the uncached store.
pub fn build_rotation_workflow(
    config: &AppConfig,
    backend: &SecretBackend,
) -> Result<RotationWorkflow> {
    let provider = build_token_provider(config)?;
    Ok(RotationWorkflow::new(backend.store.clone(), provider))
}

/// Digest workflow; its secret reads go through a TTL cache.
pub async fn build_digest_workflow(
    config: &AppConfig,
    backend: &SecretBackend,
) -> Result<DigestWorkflow> {
    config.validate_for_digest()?;

    let readers: Arc<dyn SecretStore> =
        Arc::new(CachedSecretStore::new(backend.store.clone(), config.secrets.cache_ttl()));

    let insights: Arc<dyn InsightsSource> = if config.stubs.insights {
        Arc::new(StubInsightsSource::new())
    } else {
        let business_id = config
            .digest
            .ig_business_id
            .clone()
            .ok_or_else(|| Error::config("IG_BUSINESS_ID is required"))?;
        Arc::new(GraphInsightsClient::new(
            GraphInsightsConfig {
                graph_base_url: config.provider.graph_base_url.clone(),
                graph_api_version: config.provider.graph_api_version.clone(),
                business_id,
                token_secret_name: config.secrets.ig_token_secret_name.clone(),
                timeout: config.http_timeout(),
            },
            readers.clone(),
        )?)
    };

    let model: Arc<dyn LanguageModel> = if config.stubs.llm {
        Arc::new(StubLanguageModel::new())
    } else {
        Arc::new(OpenAiClient::new(
            OpenAiConfig {
                base_url: config.digest.openai_base_url.clone(),
                model: config.digest.openai_model.clone(),
                api_key_secret_name: config.digest.openai_secret_name.clone(),
                timeout: config.http_timeout(),
            },
            readers.clone(),
        )?)
    };

    let sender: Arc<dyn NotificationSender> = if config.stubs.email {
        Arc::new(StubEmailSender::new())
    } else {
        Arc::new(build_smtp_sender(config, readers.as_ref()).await?)
    };

    let recipients = match (&config.email.to_email, &config.email.from_email) {
        (Some(to), Some(from)) => Recipients { to: to.clone(), from: from.clone() },
        _ => return Err(Error::config("TO_EMAIL and FROM_EMAIL are required")),
    };

    info!(
        insights = insights.name(),
        model = model.name(),
        sender = sender.name(),
        "Digest workflow assembled"
    );

    Ok(DigestWorkflow::new(
        insights,
        RecommendationGenerator::new(model),
        sender,
        recipients,
        config.digest.lookback_days,
    ))
}

async fn build_smtp_sender(config: &AppConfig, store: &dyn SecretStore) -> Result<SmtpEmailSender> {
    let host =
        config.email.smtp_host.clone().ok_or_else(|| Error::config("SMTP_HOST is required"))?;

    let password = match &config.email.smtp_password_secret_name {
        Some(name) => {
            let raw = store.get_current_value(name).await?;
            Some(extract_secret_field(&raw, &SMTP_PASSWORD_KEYS)?)
        }
        None => None,
    };

    let sender = SmtpEmailSender::new(&SmtpConfig {
        host,
        port: config.email.smtp_port,
        security: config.email.smtp_security,
        username: config.email.smtp_username.clone(),
        password,
    })?;
    Ok(sender)
}
