//! Structured credential payloads stored as secret values.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, SecretsError};
use super::types::SecretString;

/// JSON document stored in each version of the access-token secret.
///
/// ```json
/// {"access_token": "IGQVJ...", "expires_in": 5184000, "refreshed_at": "2025-10-05T08:00:00.000Z"}
/// ```
///
/// Older versions wrote the token under `current_access_token`; it is accepted
/// as an alias when reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPayload {
    pub access_token: SecretString,
    pub expires_in: Option<u64>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Wire form accepted when reading. `access_token` wins over the legacy key
/// when both are present and non-empty.
#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    access_token: Option<SecretString>,
    #[serde(default)]
    current_access_token: Option<SecretString>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refreshed_at: Option<DateTime<Utc>>,
}

/// Serialized form. Kept separate so the token is written explicitly rather
/// than through `SecretString`'s redacting `Serialize`.
#[derive(Serialize)]
struct StoredPayload<'a> {
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refreshed_at: Option<String>,
}

impl CredentialPayload {
    pub fn new(access_token: SecretString) -> Self {
        Self { access_token, expires_in: None, refreshed_at: None }
    }

    /// Payload for a freshly minted token, stamped with `refreshed_at`.
    pub fn refreshed(
        access_token: SecretString,
        expires_in: Option<u64>,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        Self { access_token, expires_in, refreshed_at: Some(refreshed_at) }
    }

    /// Parse a stored secret value.
    ///
    /// Fails when the value is not JSON or carries no non-empty access token.
    pub fn parse(raw: &SecretString) -> Result<Self> {
        let payload: RawPayload = serde_json::from_str(raw.expose_secret()).map_err(|e| {
            // serde_json errors never echo the input, only its position.
            SecretsError::invalid_value(format!("credential payload is not valid JSON: {}", e))
        })?;

        let access_token = [payload.access_token, payload.current_access_token]
            .into_iter()
            .flatten()
            .find(|token| !token.is_empty())
            .ok_or_else(|| {
                SecretsError::invalid_value("credential payload has an empty access_token")
            })?;

        Ok(Self {
            access_token,
            expires_in: payload.expires_in,
            refreshed_at: payload.refreshed_at,
        })
    }

    /// Render the payload as the JSON string written to the store.
    pub fn to_secret_string(&self) -> Result<SecretString> {
        let stored = StoredPayload {
            access_token: self.access_token.expose_secret(),
            expires_in: self.expires_in,
            refreshed_at: self
                .refreshed_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        Ok(SecretString::new(serde_json::to_string(&stored)?))
    }
}

/// Resolve a single credential from a stored secret value.
///
/// Values are stored either as the bare credential or as a JSON object holding
/// it under one of several conventional keys; the first non-empty key wins.
pub fn extract_secret_field(raw: &SecretString, keys: &[&str]) -> Result<SecretString> {
    let trimmed = raw.expose_secret().trim();

    if trimmed.starts_with('{') {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(trimmed)?;
        return keys
            .iter()
            .find_map(|key| {
                object.get(*key).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty())
            })
            .map(SecretString::from)
            .ok_or_else(|| {
                SecretsError::invalid_value(format!(
                    "secret JSON has none of the expected keys: {}",
                    keys.join(", ")
                ))
            });
    }

    if trimmed.is_empty() {
        return Err(SecretsError::invalid_value("secret value is empty"));
    }
    Ok(SecretString::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_payload() {
        let payload = CredentialPayload::parse(&r#"{"access_token":"OLD"}"#.into()).unwrap();
        assert_eq!(payload.access_token.expose_secret(), "OLD");
        assert_eq!(payload.expires_in, None);
        assert_eq!(payload.refreshed_at, None);
    }

    #[test]
    fn test_parse_legacy_key() {
        let payload =
            CredentialPayload::parse(&r#"{"current_access_token":"old_token_value"}"#.into())
                .unwrap();
        assert_eq!(payload.access_token.expose_secret(), "old_token_value");
    }

    #[test]
    fn test_parse_prefers_access_token_over_legacy_key() {
        let raw = r#"{"access_token":"NEW","current_access_token":"OLD"}"#.into();
        let payload = CredentialPayload::parse(&raw).unwrap();
        assert_eq!(payload.access_token.expose_secret(), "NEW");

        let raw = r#"{"access_token":"","current_access_token":"OLD"}"#.into();
        let payload = CredentialPayload::parse(&raw).unwrap();
        assert_eq!(payload.access_token.expose_secret(), "OLD");
    }

    #[test]
    fn test_parse_rejects_missing_or_empty_token() {
        assert!(CredentialPayload::parse(&"{}".into()).is_err());
        assert!(CredentialPayload::parse(&r#"{"access_token":""}"#.into()).is_err());
        assert!(CredentialPayload::parse(&"not json".into()).is_err());
    }

    #[test]
    fn test_parse_error_does_not_echo_value() {
        let err = CredentialPayload::parse(&"IGQVJ-raw-token".into()).unwrap_err();
        assert!(!err.to_string().contains("IGQVJ-raw-token"));
    }

    #[test]
    fn test_refreshed_payload_shape() {
        let at = Utc.with_ymd_and_hms(2025, 10, 5, 8, 0, 0).unwrap();
        let payload = CredentialPayload::refreshed("NEW".into(), Some(5_184_000), at);
        let raw = payload.to_secret_string().unwrap();

        let json: serde_json::Value = serde_json::from_str(raw.expose_secret()).unwrap();
        assert_eq!(json["access_token"], "NEW");
        assert_eq!(json["expires_in"], 5_184_000);
        assert_eq!(json["refreshed_at"], "2025-10-05T08:00:00.000Z");

        assert_eq!(CredentialPayload::parse(&raw).unwrap(), payload);
    }

    #[test]
    fn test_extract_field_from_json_and_raw() {
        let keys = ["api_key", "key", "OPENAI_API_KEY"];

        let from_json = extract_secret_field(&r#"{"OPENAI_API_KEY":"sk-1"}"#.into(), &keys);
        assert_eq!(from_json.unwrap().expose_secret(), "sk-1");

        let first_wins = extract_secret_field(&r#"{"key":"b","api_key":"a"}"#.into(), &keys);
        assert_eq!(first_wins.unwrap().expose_secret(), "a");

        let raw = extract_secret_field(&"  sk-raw \n".into(), &keys);
        assert_eq!(raw.unwrap().expose_secret(), "sk-raw");

        assert!(extract_secret_field(&r#"{"other":"x"}"#.into(), &keys).is_err());
        assert!(extract_secret_field(&"   ".into(), &keys).is_err());
    }
}
