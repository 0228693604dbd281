//! Authenticated HTTP client for the portal microservices
//!
//! Wraps reqwest::Client with bearer injection and a one-shot token refresh
//! when the stored credential has already run out.

use anyhow::{bail, Context, Result};

use crate::auth::{AuthClient, CredentialStore};
use crate::config::Config;
use crate::session::clock::TokenClock;
use crate::session::RefreshApi;

/// Authenticated client for the portal's REST resources.
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl PortalClient {
    /// Load config and build the client. Attempts a refresh if the stored
    /// token is expired.
    pub async fn new() -> Result<Self> {
        let mut config = Config::load()?;

        let Some(credential) = config.get_credential() else {
            bail!("Not logged in. Run 'partes-cli login'.");
        };

        let credential = if TokenClock::wall().seconds_remaining(Some(&credential)) == 0 {
            tracing::info!("Access token expired, refreshing...");
            let auth = AuthClient::new(config.auth_base.clone());
            match auth.refresh(&credential.refresh_token).await {
                Ok(fresh) => {
                    config.set_credential(fresh.clone());
                    config.save()?;
                    tracing::info!("Token refreshed");
                    fresh
                }
                Err(e) => {
                    bail!("Token refresh failed: {}. Run 'partes-cli login'.", e);
                }
            }
        } else {
            credential
        };

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.api_base.clone(),
            access_token: credential.access_token,
        })
    }

    /// GET request to a portal resource (bearer auth).
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Portal GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Portal GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// GET request with query parameters (pagination, filters).
    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Portal GET {} {:?}", url, query);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Portal GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request to a portal resource (bearer auth).
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Portal POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Portal POST {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'partes-cli login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
