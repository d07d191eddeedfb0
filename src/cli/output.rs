//! Status line output for CLI commands.
//!
//! Every command prints exactly one compact JSON object to stdout so
//! schedulers and wrappers can parse the result. Logs go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;

/// Overall result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// One-line machine-readable summary of a command run.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLine<T: Serialize> {
    pub status: Status,
    pub command: &'static str,
    #[serde(flatten)]
    pub detail: T,
}

/// Failure detail shared by every command.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> StatusLine<T> {
    pub fn ok(command: &'static str, detail: T) -> Self {
        Self { status: Status::Ok, command, detail }
    }

    pub fn error(command: &'static str, detail: T) -> Self {
        Self { status: Status::Error, command, detail }
    }
}

impl From<&crate::errors::Error> for ErrorDetail {
    fn from(err: &crate::errors::Error) -> Self {
        let retryable = match err {
            crate::errors::Error::Rotation(e) => Some(e.is_retryable()),
            _ => None,
        };
        Self { kind: err.kind(), message: err.to_string(), retryable }
    }
}

/// Render as a single line of JSON.
pub fn render<T: Serialize>(line: &StatusLine<T>) -> Result<String> {
    serde_json::to_string(line).context("Failed to serialize status line")
}

/// Print the status line to stdout.
pub fn print_status<T: Serialize>(line: &StatusLine<T>) -> Result<()> {
    println!("{}", render(line)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_ok_line_flattens_detail() {
        let line = StatusLine::ok("digest", json!({"posts": 3}));
        let value: Value = serde_json::from_str(&render(&line).unwrap()).unwrap();
        assert_eq!(value, json!({"status": "ok", "command": "digest", "posts": 3}));
    }

    #[test]
    fn test_error_line_is_single_line() {
        let line = StatusLine::error(
            "rotate",
            ErrorDetail {
                kind: "unknown_step",
                message: "Unknown rotation step: rotateEverything".to_string(),
                retryable: Some(false),
            },
        );
        let rendered = render(&line).unwrap();
        assert!(!rendered.contains('\n'));

        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["kind"], "unknown_step");
        assert_eq!(value["retryable"], false);
    }
}
