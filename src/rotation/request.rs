//! Coordinator invocation payload and step names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::error::RotationError;

/// One of the four rotation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    pub const ALL: [RotationStep; 4] =
        [Self::CreateSecret, Self::SetSecret, Self::TestSecret, Self::FinishSecret];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    /// Step names are matched exactly; anything else is an unknown step.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| RotationError::unknown_step(s))
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single coordinator invocation.
///
/// ```json
/// {"SecretId": "INSTAGRAM_SECRET_KEY", "ClientRequestToken": "T1", "Step": "createSecret"}
/// ```
///
/// `Step` stays a raw string so an unrecognized value reaches the workflow and
/// fails as [`RotationError::UnknownStep`] rather than as a decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct RotationRequest {
    #[validate(length(min = 1, message = "SecretId must not be empty"))]
    pub secret_id: String,

    #[validate(length(min = 1, message = "ClientRequestToken must not be empty"))]
    pub client_request_token: String,

    pub step: String,
}

impl RotationRequest {
    pub fn new(
        secret_id: impl Into<String>,
        client_request_token: impl Into<String>,
        step: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            client_request_token: client_request_token.into(),
            step: step.into(),
        }
    }

    /// Decode the coordinator's JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, RotationError> {
        serde_json::from_str(payload)
            .map_err(|e| RotationError::invalid_request(format!("malformed payload: {}", e)))
    }

    pub fn step(&self) -> Result<RotationStep, RotationError> {
        self.step.parse()
    }

    /// Parse the step, then check the identifiers.
    ///
    /// The step is checked first so an unknown step is reported as such
    /// whatever the other fields contain.
    pub fn parse_step(&self) -> Result<RotationStep, RotationError> {
        let step = self.step()?;
        self.validate().map_err(|e| RotationError::invalid_request(e.to_string()))?;
        Ok(step)
    }
}
