//! `rotate` command: handle one coordinator invocation, or walk every step
//! for a token when running locally.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use super::output::{print_status, ErrorDetail, StatusLine};
use crate::config::AppConfig;
use crate::errors::Error;
use crate::rotation::{RotationError, RotationOutcome, RotationRequest, RotationStep};
use crate::secrets::{InMemorySecretStore, SecretStore, StageLabel};
use crate::startup::{build_rotation_workflow, SecretBackend};

pub(crate) const COMMAND: &str = "rotate";

#[derive(Debug, Clone, Args)]
pub struct RotateArgs {
    /// Coordinator payload file (`{"SecretId", "ClientRequestToken", "Step"}`), `-` for stdin
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["secret_id", "client_request_token", "step", "all_steps"]
    )]
    pub event: Option<String>,

    /// Secret to rotate
    #[arg(long, required_unless_present = "event")]
    pub secret_id: Option<String>,

    /// Version id of the rotation in progress
    #[arg(long)]
    pub client_request_token: Option<String>,

    /// createSecret, setSecret, testSecret or finishSecret
    #[arg(long, required_unless_present_any = ["event", "all_steps"])]
    pub step: Option<String>,

    /// Run all four steps in order, stopping at the first failure
    #[arg(long, conflicts_with = "step")]
    pub all_steps: bool,
}

#[derive(Debug)]
enum RotatePlan {
    Single(RotationRequest),
    AllSteps { secret_id: String, token: Option<String> },
}

impl RotateArgs {
    async fn plan(self) -> Result<RotatePlan, RotationError> {
        if let Some(source) = self.event {
            let payload = read_event(&source)
                .await
                .map_err(|e| RotationError::invalid_request(format!("{:#}", e)))?;
            return RotationRequest::from_json(&payload).map(RotatePlan::Single);
        }

        let secret_id = self.secret_id.unwrap_or_default();
        if self.all_steps {
            return Ok(RotatePlan::AllSteps { secret_id, token: self.client_request_token });
        }

        Ok(RotatePlan::Single(RotationRequest::new(
            secret_id,
            self.client_request_token.unwrap_or_default(),
            self.step.unwrap_or_default(),
        )))
    }
}

async fn read_event(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .context("Failed to read event from stdin")?;
        return Ok(payload);
    }

    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read event file {}", source))
}

#[derive(Debug, Serialize)]
struct StepDone {
    secret_id: String,
    step: String,
    outcome: RotationOutcome,
}

#[derive(Debug, Serialize)]
struct StepResult {
    step: &'static str,
    outcome: RotationOutcome,
}

#[derive(Debug, Serialize)]
struct SequenceDone {
    secret_id: String,
    client_request_token: String,
    steps: Vec<StepResult>,
}

#[derive(Debug, Serialize)]
struct RotateFailure {
    #[serde(flatten)]
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    completed: Vec<StepResult>,
}

fn fail(
    err: RotationError,
    step: Option<String>,
    completed: Vec<StepResult>,
) -> anyhow::Result<()> {
    let err = Error::from(err);
    print_status(&StatusLine::error(
        COMMAND,
        RotateFailure { error: ErrorDetail::from(&err), step, completed },
    ))?;
    Err(err.into())
}

/// Handle the `rotate` command.
pub async fn handle_rotate_command(
    args: RotateArgs,
    config: &AppConfig,
    backend: &SecretBackend,
) -> anyhow::Result<()> {
    let workflow = match build_rotation_workflow(config, backend) {
        Ok(workflow) => workflow,
        Err(err) => return super::report_failure(COMMAND, err),
    };

    let plan = match args.plan().await {
        Ok(plan) => plan,
        Err(err) => return fail(err, None, Vec::new()),
    };

    match plan {
        RotatePlan::Single(request) => match workflow.handle(&request).await {
            Ok(outcome) => print_status(&StatusLine::ok(
                COMMAND,
                StepDone { secret_id: request.secret_id, step: request.step, outcome },
            )),
            Err(err) => fail(err, Some(request.step), Vec::new()),
        },
        RotatePlan::AllSteps { secret_id, token } => {
            let token = match prepare_token(backend, &secret_id, token).await {
                Ok(token) => token,
                Err(err) => return fail(err, None, Vec::new()),
            };

            let mut completed = Vec::new();
            for step in RotationStep::ALL {
                let request = RotationRequest::new(&secret_id, &token, step.as_str());
                match workflow.handle(&request).await {
                    Ok(outcome) => completed.push(StepResult { step: step.as_str(), outcome }),
                    Err(err) => return fail(err, Some(step.as_str().to_string()), completed),
                }
            }

            print_status(&StatusLine::ok(
                COMMAND,
                SequenceDone { secret_id, client_request_token: token, steps: completed },
            ))
        }
    }
}

/// With the in-memory store the CLI plays coordinator and stages the token
/// itself; other stores must already have it staged.
async fn prepare_token(
    backend: &SecretBackend,
    secret_id: &str,
    token: Option<String>,
) -> Result<String, RotationError> {
    let Some(memory) = &backend.memory else {
        return token.ok_or_else(|| {
            RotationError::invalid_request(
                "--client-request-token is required unless SECRET_STORE_BACKEND=memory",
            )
        });
    };

    let token = match token {
        Some(token) => {
            reject_filled_version(memory, secret_id, &token).await?;
            token
        }
        None => uuid::Uuid::new_v4().to_string(),
    };
    memory.stage_pending(secret_id, &token).await?;
    tracing::info!(secret_id = %secret_id, client_request_token = %token, "Staged pending version");
    Ok(token)
}

/// An existing version that holds a value may only be reused while it is PENDING.
async fn reject_filled_version(
    memory: &InMemorySecretStore,
    secret_id: &str,
    token: &str,
) -> Result<(), RotationError> {
    let versions = memory.describe_versions(secret_id).await?;
    if !versions.contains(token) || versions.has_stage(token, &StageLabel::Pending) {
        return Ok(());
    }
    if memory.get_version_value(secret_id, token).await?.is_some() {
        return Err(RotationError::invalid_request(format!(
            "client request token {} is an existing version of '{}'; pass a new token",
            token, secret_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RotateArgs,
    }

    fn parse(argv: &[&str]) -> Result<RotateArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("rotate").chain(argv.iter().copied()))
            .map(|h| h.args)
    }

    #[tokio::test]
    async fn test_flags_become_request() {
        let args = parse(&[
            "--secret-id",
            "IG_TOKEN",
            "--client-request-token",
            "T1",
            "--step",
            "createSecret",
        ])
        .unwrap();

        match args.plan().await.unwrap() {
            RotatePlan::Single(request) => {
                assert_eq!(request, RotationRequest::new("IG_TOKEN", "T1", "createSecret"));
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_file_is_decoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"SecretId":"IG_TOKEN","ClientRequestToken":"T1","Step":"finishSecret"}}"#
        )
        .unwrap();

        let args = parse(&["--event", file.path().to_str().unwrap()]).unwrap();
        match args.plan().await.unwrap() {
            RotatePlan::Single(request) => assert_eq!(request.step, "finishSecret"),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_event_file_is_invalid_request() {
        let args = parse(&["--event", "/nonexistent/social-digest-event.json"]).unwrap();
        let err = args.plan().await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidRequest { .. }));
    }

    #[test]
    fn test_event_conflicts_with_flags() {
        assert!(parse(&["--event", "-", "--step", "createSecret"]).is_err());
        assert!(parse(&["--secret-id", "IG_TOKEN"]).is_err());
        assert!(parse(&["--secret-id", "IG_TOKEN", "--all-steps"]).is_ok());
        assert!(parse(&["--secret-id", "IG_TOKEN", "--all-steps", "--step", "setSecret"]).is_err());
    }

    #[tokio::test]
    async fn test_prepare_token_requires_token_outside_memory() {
        let backend = SecretBackend {
            store: std::sync::Arc::new(crate::secrets::EnvVarSecretStore::new()),
            memory: None,
        };
        let err = prepare_token(&backend, "IG_TOKEN", None).await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_prepare_token_stages_in_memory() {
        let memory = crate::secrets::InMemorySecretStore::new();
        memory.insert_current("IG_TOKEN", r#"{"access_token":"OLD"}"#).await;
        let backend = SecretBackend::from_memory(memory.clone());

        let token = prepare_token(&backend, "IG_TOKEN", None).await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(memory.version_count("IG_TOKEN").await, 2);
    }

    #[tokio::test]
    async fn test_prepare_token_refuses_existing_version_with_value() {
        let memory = crate::secrets::InMemorySecretStore::new();
        let previous = memory.insert_current("IG_TOKEN", r#"{"access_token":"OLDER"}"#).await;
        memory.insert_current("IG_TOKEN", r#"{"access_token":"OLD"}"#).await;
        let backend = SecretBackend::from_memory(memory.clone());

        let err = prepare_token(&backend, "IG_TOKEN", Some(previous.clone())).await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidRequest { .. }));

        let after = memory.describe_versions("IG_TOKEN").await.unwrap();
        assert!(after.has_stage(&previous, &StageLabel::Previous));
        assert!(after.versions_with(&StageLabel::Pending).is_empty());
    }

    #[tokio::test]
    async fn test_prepare_token_resumes_pending_version() {
        let memory = crate::secrets::InMemorySecretStore::new();
        memory.insert_current("IG_TOKEN", r#"{"access_token":"OLD"}"#).await;
        memory.stage_pending("IG_TOKEN", "T1").await.unwrap();
        let value = r#"{"access_token":"NEW"}"#.into();
        memory.put_pending_value("IG_TOKEN", "T1", &value).await.unwrap();
        let backend = SecretBackend::from_memory(memory.clone());

        let token = prepare_token(&backend, "IG_TOKEN", Some("T1".to_string())).await.unwrap();
        assert_eq!(token, "T1");
        assert_eq!(memory.version_count("IG_TOKEN").await, 2);
    }
}
