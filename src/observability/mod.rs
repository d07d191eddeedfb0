//! # Observability
//!
//! Structured logging for both entry points. JSON output for deployed runs,
//! human-readable output for local development. `RUST_LOG` takes precedence
//! over the configured `LOG_LEVEL`.

pub mod logging;

pub use logging::{log_config_info, service_span};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Install the global subscriber.
///
/// A subscriber installed earlier (tests, embedding hosts) is left in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = if config.json_logging {
        let layer =
            fmt::layer().json().with_target(true).with_current_span(true).with_span_list(true);
        registry.with(layer).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if installed.is_ok() {
        tracing::debug!(
            service = %config.service_name,
            environment = %config.environment,
            json = config.json_logging,
            "Logging initialized"
        );
    }

    Ok(())
}
