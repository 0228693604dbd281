//! Portal auth service client: login and token refresh.
//!
//! The auth service issues a bearer credential on login and exchanges a
//! refresh token for a fresh one on `/refresh`. Both endpoints answer with
//! the same envelope.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::Credential;
use crate::session::{RefreshApi, RenewalError};

/// Response envelope from the auth service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub successful: bool,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// HTTP client for the portal auth service.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Authenticate with username/password and return the issued credential.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential> {
        let url = format!("{}/login", self.base_url);
        tracing::debug!("Auth POST {}", url);

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .context("Failed to call the auth service")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Login failed (HTTP {}): {}", status.as_u16(), body);
        }

        let auth: AuthResponse = resp.json().await.context("Failed to parse login response")?;
        credential_from(auth, None).map_err(|e| anyhow::anyhow!("Login rejected: {}", e))
    }
}

#[async_trait]
impl RefreshApi for AuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RenewalError> {
        let url = format!("{}/refresh", self.base_url);
        tracing::debug!("Auth POST {}", url);

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| RenewalError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RenewalError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let auth: AuthResponse = resp
            .json()
            .await
            .map_err(|e| RenewalError::Malformed(e.to_string()))?;

        if !auth.successful {
            return Err(RenewalError::Rejected(
                auth.error.unwrap_or_else(|| "refresh not accepted".to_string()),
            ));
        }

        // The server may omit the refresh token; the old one stays usable.
        credential_from(auth, Some(refresh_token)).map_err(RenewalError::Malformed)
    }
}

/// Assemble a credential from an auth response, reusing `fallback_refresh`
/// when the server did not rotate the refresh token.
fn credential_from(auth: AuthResponse, fallback_refresh: Option<&str>) -> Result<Credential, String> {
    if !auth.successful {
        return Err(auth.error.unwrap_or_else(|| "not successful".to_string()));
    }

    if let Some(ref token_type) = auth.token_type {
        if !token_type.eq_ignore_ascii_case("bearer") {
            return Err(format!("unsupported token type {}", token_type));
        }
    }

    let access_token = auth.access_token.ok_or("missing accessToken")?;
    let expires_in = auth.expires_in.ok_or("missing expiresIn")?;
    let refresh_token = auth
        .refresh_token
        .or_else(|| fallback_refresh.map(str::to_string))
        .ok_or("missing refreshToken")?;
    let issued_at = auth.issued_at.unwrap_or_else(Utc::now);

    Ok(Credential::new(
        access_token,
        refresh_token,
        issued_at,
        expires_in,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> AuthResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_response_builds_a_credential() {
        let auth = response(
            r#"{
                "successful": true,
                "accessToken": "tok",
                "tokenType": "Bearer",
                "refreshToken": "ref",
                "expiresIn": 300,
                "issuedAt": "2026-01-01T00:00:00Z"
            }"#,
        );
        let cred = credential_from(auth, None).unwrap();
        assert_eq!(cred.access_token, "tok");
        assert_eq!(cred.refresh_token, "ref");
        assert_eq!(cred.expires_in, 300);
    }

    #[test]
    fn omitted_refresh_token_reuses_the_old_one() {
        let auth = response(
            r#"{ "successful": true, "accessToken": "tok", "expiresIn": 300 }"#,
        );
        let cred = credential_from(auth, Some("old-refresh")).unwrap();
        assert_eq!(cred.refresh_token, "old-refresh");
    }

    #[test]
    fn unsuccessful_response_is_an_error() {
        let auth = response(r#"{ "successful": false, "error": "bad credentials" }"#);
        assert_eq!(credential_from(auth, None).unwrap_err(), "bad credentials");
    }

    #[test]
    fn non_bearer_token_type_is_rejected() {
        let auth = response(
            r#"{ "successful": true, "accessToken": "tok", "tokenType": "MAC", "expiresIn": 300 }"#,
        );
        assert!(credential_from(auth, Some("r")).is_err());
    }

    #[test]
    fn missing_fields_are_malformed() {
        let auth = response(r#"{ "successful": true, "expiresIn": 300 }"#);
        assert!(credential_from(auth, None).is_err());

        let auth = response(r#"{ "successful": true, "accessToken": "tok" }"#);
        assert!(credential_from(auth, Some("r")).is_err());
    }
}
