//! Utility functions and helpers

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maximum number of response-body bytes kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Failure of a single outbound HTTP call.
///
/// Every non-2xx status is treated uniformly as failure; callers translate this
/// into their own error type.
#[derive(Debug, thiserror::Error)]
pub enum HttpFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HttpFailure {
    fn from(err: reqwest::Error) -> Self {
        // Drop the URL: provider URLs carry access tokens as query parameters.
        Self::Transport(err.without_url().to_string())
    }
}

/// Build the shared HTTP client with a request timeout.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("social-digest/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Check the status and decode a JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HttpFailure> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HttpFailure::Status { status, body: truncate(&body, MAX_ERROR_BODY) });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| HttpFailure::Decode(e.to_string()))
}

/// Truncate on a char boundary, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
