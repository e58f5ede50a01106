//! Twitch OAuth endpoint collaborator
//!
//! The token provider never talks HTTP itself. Everything that reaches
//! `id.twitch.tv` goes through the [`TokenGrant`] trait so the token
//! lifecycle can be exercised without a network.

use super::types::{deserialize_scopes, AccessToken, AuthError, AuthResult, TokenValidation};
use crate::error::ErrorResponse;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Twitch OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Default Twitch OAuth token validation endpoint
pub const DEFAULT_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";

/// Default Twitch OAuth token revocation endpoint
pub const DEFAULT_REVOKE_URL: &str = "https://id.twitch.tv/oauth2/revoke";

/// Operations against the Twitch OAuth server
#[async_trait]
pub trait TokenGrant: Send + Sync {
    /// Obtain an app access token through the client-credentials grant
    async fn client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<AccessToken>;

    /// Ask Twitch whether a token is still live
    async fn validate(&self, token: &str) -> AuthResult<TokenValidation>;

    /// Revoke a token upstream
    async fn revoke(&self, client_id: &str, token: &str) -> AuthResult<()>;

    /// Get grant name for logging/debugging
    fn name(&self) -> &str;
}

/// OAuth endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    /// Client-credentials token endpoint
    pub token_url: String,
    /// Token validation endpoint
    pub validate_url: String,
    /// Token revocation endpoint
    pub revoke_url: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            validate_url: DEFAULT_VALIDATE_URL.to_string(),
            revoke_url: DEFAULT_REVOKE_URL.to_string(),
        }
    }
}

impl AuthEndpoints {
    /// Endpoints rooted at a custom OAuth server (e.g. a mock server)
    pub fn with_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            token_url: format!("{base}/oauth2/token"),
            validate_url: format!("{base}/oauth2/validate"),
            revoke_url: format!("{base}/oauth2/revoke"),
        }
    }
}

/// Body of a successful client-credentials grant
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default, deserialize_with = "deserialize_scopes")]
    scope: Vec<String>,
}

/// [`TokenGrant`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTokenGrant {
    http_client: reqwest::Client,
    endpoints: AuthEndpoints,
}

impl HttpTokenGrant {
    /// Create a grant client with its own HTTP client
    pub fn new(endpoints: AuthEndpoints, timeout: Duration) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(http_client, endpoints))
    }

    /// Reuse an existing HTTP client
    pub fn with_client(http_client: reqwest::Client, endpoints: AuthEndpoints) -> Self {
        Self {
            http_client,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl TokenGrant for HttpTokenGrant {
    async fn client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<AccessToken> {
        debug!("Requesting app access token from {}", self.endpoints.token_url);

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token request failed: {}", e)))?;

        let response = ensure_success(response).await?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        Ok(AccessToken::app_generated(
            token.access_token,
            token.expires_in,
            token.scope,
        ))
    }

    async fn validate(&self, token: &str) -> AuthResult<TokenValidation> {
        debug!("Validating access token");

        let response = self
            .http_client
            .get(&self.endpoints.validate_url)
            .header("Authorization", format!("OAuth {}", token))
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token validation request failed: {}", e)))?;

        let response = ensure_success(response).await?;

        response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse validation response: {}", e))
        })
    }

    async fn revoke(&self, client_id: &str, token: &str) -> AuthResult<()> {
        debug!("Revoking access token");

        let response = self
            .http_client
            .post(&self.endpoints.revoke_url)
            .form(&[("client_id", client_id), ("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token revocation request failed: {}", e)))?;

        ensure_success(response).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "twitch-oauth"
    }
}

/// Turn any non-2xx answer from the OAuth server into an authentication failure
async fn ensure_success(response: Response) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.map_err(|e| {
        AuthError::Network(format!("Failed to read OAuth error response ({status}): {e}"))
    })?;
    Err(AuthError::Authentication {
        status: Some(status.as_u16()),
        reason: upstream_reason(status, &body),
    })
}

/// Prefer Twitch's `message`, then the raw body, then the canonical reason
pub(crate) fn upstream_reason(status: StatusCode, body: &str) -> String {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = error_response.message.filter(|m| !m.is_empty()) {
            return message;
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
