//! Google OAuth credential relay
//!
//! Exchanges a stored refresh token for a fresh access token on every call.
//! The installed-app client secrets and the refresh token live in two JSON
//! files produced by the one-off consent flow:
//!
//! - `credentials.json`: `{"installed": {"client_id", "client_secret", "token_uri"}}`
//! - `token.json`: `{"refresh_token", "scopes"?}`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calpilot_core::CredentialProvider;
use calpilot_domain::constants::{ACCESS_TOKEN_ENV, GOOGLE_TOKEN_URI};
use calpilot_domain::{CalPilotError, GoogleConfig, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::http::HttpClient;

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    #[serde(alias = "web")]
    installed: InstalledApp,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct StoredToken {
    refresh_token: String,
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Refresh-token based [`CredentialProvider`].
pub struct OAuthCredentialRelay {
    http_client: HttpClient,
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl OAuthCredentialRelay {
    pub fn new(
        http_client: HttpClient,
        credentials_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        Self { http_client, credentials_path: credentials_path.into(), token_path: token_path.into() }
    }

    pub fn from_config(config: &GoogleConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::new()?, &config.credentials_path, &config.token_path))
    }

    async fn refresh(&self) -> Result<String> {
        let secrets: ClientSecrets = read_json(&self.credentials_path).await?;
        let stored: StoredToken = read_json(&self.token_path).await?;
        let app = secrets.installed;
        debug!(token_uri = %app.token_uri, scopes = ?stored.scopes, "Refreshing Google access token");

        let form = [
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
            ("refresh_token", stored.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let request = self.http_client.request(Method::POST, app.token_uri.as_str()).form(&form);
        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|e| CalPilotError::Credential(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CalPilotError::Credential(format!(
                "Token refresh failed ({}): {}",
                status, error_text
            )));
        }

        let refreshed: TokenRefreshResponse = response.json().await.map_err(|e| {
            CalPilotError::Credential(format!("Failed to parse token response: {}", e))
        })?;
        info!(expires_in = ?refreshed.expires_in, "Google access token refreshed");
        Ok(refreshed.access_token)
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialRelay {
    async fn access_token(&self) -> Result<String> {
        self.refresh().await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        CalPilotError::Credential(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| CalPilotError::Credential(format!("invalid {}: {}", path.display(), e)))
}

/// Provider that hands out a token obtained elsewhere.
///
/// Used by a spawned tool server when the parent forwards its token through
/// the environment.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Read the forwarded token, if any.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
