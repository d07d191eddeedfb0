//! # Structured Logging
//!
//! Span macros and startup logging helpers built on the tracing ecosystem.
//!
//! Every rotation invocation runs inside a `rotation` span carrying the secret
//! id, step and client request token; every digest run inside a `digest` span.
//! In JSON mode those span fields are attached to each event emitted inside
//! them, so a log search by token finds the whole invocation.

/// Create a tracing span for one rotation step invocation.
#[macro_export]
macro_rules! rotation_span {
    ($step:expr, $secret_id:expr, $token:expr) => {
        tracing::info_span!(
            "rotation",
            step = %$step,
            secret_id = %$secret_id,
            client_request_token = %$token,
            invocation_id = %uuid::Uuid::new_v4()
        )
    };
    ($step:expr, $secret_id:expr, $token:expr, $($field:tt)*) => {
        tracing::info_span!(
            "rotation",
            step = %$step,
            secret_id = %$secret_id,
            client_request_token = %$token,
            invocation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for one digest run
#[macro_export]
macro_rules! digest_span {
    ($days:expr, $source:expr, $sender:expr) => {
        tracing::info_span!(
            "digest",
            lookback_days = $days,
            source = %$source,
            sender = %$sender,
            run_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Root span carrying the base fields every event should have.
pub fn service_span(config: &crate::config::ObservabilityConfig) -> tracing::Span {
    tracing::info_span!(
        "service",
        service = %config.service_name,
        environment = %config.environment
    )
}

/// Log configuration at startup. Secret names are logged, never values.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        secret_store = %config.secrets.backend,
        cache_ttl_seconds = config.secrets.cache_ttl_seconds,
        ig_token_secret = %config.secrets.ig_token_secret_name,
        grant = %config.provider.grant,
        graph_api_version = %config.provider.graph_api_version,
        stub_insights = config.stubs.insights,
        stub_llm = config.stubs.llm,
        stub_email = config.stubs.email,
        "social-digest configuration"
    );
}
