//! `digest` command: one insight → recommendation → email run.

use super::output::{print_status, StatusLine};
use crate::config::AppConfig;
use crate::digest::DigestReport;
use crate::errors::Error;
use crate::startup::{build_digest_workflow, SecretBackend};

pub(crate) const COMMAND: &str = "digest";

async fn run(
    days: Option<u32>,
    config: &AppConfig,
    backend: &SecretBackend,
) -> Result<DigestReport, Error> {
    let workflow = build_digest_workflow(config, backend).await?;
    Ok(workflow.run(days).await?)
}

/// Handle the `digest` command.
pub async fn handle_digest_command(
    days: Option<u32>,
    config: &AppConfig,
    backend: &SecretBackend,
) -> anyhow::Result<()> {
    match run(days, config, backend).await {
        Ok(report) => print_status(&StatusLine::ok(COMMAND, report)),
        Err(err) => super::report_failure(COMMAND, err),
    }
}
