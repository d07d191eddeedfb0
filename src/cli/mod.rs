//! # Command Line Interface
//!
//! Entry points for the credential rotation handler and the weekly digest.
//! Each command prints one JSON status line to stdout and exits non-zero on
//! failure.

pub mod digest;
pub mod output;
pub mod rotate;

use clap::{Parser, Subcommand};
use tracing::Instrument;

use crate::config::AppConfig;
use crate::errors::Error;
use crate::observability::{init_logging, log_config_info, service_span};
use crate::startup::build_secret_backend;

#[derive(Parser)]
#[command(name = "social-digest")]
#[command(about = "Instagram token rotation and weekly social media digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle a credential rotation step
    Rotate(rotate::RotateArgs),

    /// Fetch insights, generate post recommendations and email the digest
    Digest {
        /// Lookback window in days (overrides INSIGHTS_LOOKBACK_DAYS)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=90))]
        days: Option<u32>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rotate(_) => rotate::COMMAND,
            Self::Digest { .. } => digest::COMMAND,
        }
    }
}

/// Print the error status line and hand the error back for the exit code.
pub(crate) fn report_failure(command: &'static str, err: Error) -> anyhow::Result<()> {
    output::print_status(&output::StatusLine::error(command, output::ErrorDetail::from(&err)))?;
    Err(err.into())
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => return report_failure(cli.command.name(), err),
    };
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;

    let span = service_span(&config.observability);
    run_command(cli.command, config).instrument(span).await
}

async fn run_command(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    log_config_info(&config);
    let backend = match build_secret_backend(&config).await {
        Ok(backend) => backend,
        Err(err) => return report_failure(command.name(), err),
    };

    match command {
        Commands::Rotate(args) => rotate::handle_rotate_command(args, &config, &backend).await,
        Commands::Digest { days } => digest::handle_digest_command(days, &config, &backend).await,
    }
}
