//! Access token lifecycle
//!
//! The TokenProvider hides whether the bearer token was handed in by the
//! caller or obtained through the client-credentials grant. App tokens are
//! cached and fetched again once they expire or get invalidated; user tokens
//! are returned as-is for the lifetime of the client.

use super::credentials::Credentials;
use super::grant::TokenGrant;
use super::types::{AccessToken, AuthError, AuthResult, TokenMode, TokenValidation};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Cached token state, only touched while holding the provider lock
enum TokenState {
    Unauthenticated,
    UserToken(AccessToken),
    AppToken(AccessToken),
}

/// Observable provider state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    /// No token cached
    Unauthenticated,
    /// Caller-supplied token, never refreshed by the client
    UserToken,
    /// App token cached and usable
    AppTokenValid,
    /// App token cached but past its expiry
    AppTokenExpired,
}

/// Produces a currently valid bearer token on demand
pub struct TokenProvider {
    credentials: Credentials,
    grant: Arc<dyn TokenGrant>,
    expiry_margin: Duration,
    state: Mutex<TokenState>,
}

impl TokenProvider {
    /// Treat app tokens as expired this long before Twitch does
    pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(300);

    /// Create a provider. A supplied user token takes precedence over the
    /// client secret.
    pub fn new(credentials: Credentials, grant: Arc<dyn TokenGrant>, expiry_margin: Duration) -> Self {
        let state = match credentials.user_token() {
            Some(token) => TokenState::UserToken(AccessToken::user_supplied(token)),
            None => TokenState::Unauthenticated,
        };

        Self {
            credentials,
            grant,
            expiry_margin,
            state: Mutex::new(state),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    /// Mode chosen at construction; fixed for the provider's lifetime
    pub fn mode(&self) -> TokenMode {
        if self.credentials.prefers_user_token() {
            TokenMode::UserSupplied
        } else {
            TokenMode::AppGenerated
        }
    }

    pub fn is_user_token(&self) -> bool {
        self.mode() == TokenMode::UserSupplied
    }

    /// Get a valid access token, running the client-credentials grant when
    /// no usable app token is cached.
    ///
    /// The lock is held across the grant so concurrent callers wait for a
    /// single request instead of issuing their own.
    pub async fn get_token(&self) -> AuthResult<AccessToken> {
        let mut state = self.state.lock().await;

        match &*state {
            TokenState::UserToken(token) => return Ok(token.clone()),
            TokenState::AppToken(token) if !token.is_expired(self.expiry_margin) => {
                debug!("Using cached app token");
                return Ok(token.clone());
            }
            TokenState::AppToken(_) => debug!("App token expired, requesting a new one"),
            TokenState::Unauthenticated => debug!("No app token cached, requesting one"),
        }

        // Nothing partial survives a failed grant
        *state = TokenState::Unauthenticated;

        let token = self.request_app_token().await?;
        *state = TokenState::AppToken(token.clone());
        Ok(token)
    }

    /// Drop `rejected` from the cache so the next `get_token` fetches a new
    /// token.
    ///
    /// Nothing happens when the cache already holds a different token: a
    /// concurrent caller has refreshed it since `rejected` was handed out.
    /// Fails for user tokens: the client cannot issue a new one on the
    /// user's behalf.
    pub async fn invalidate(&self, rejected: &AccessToken) -> AuthResult<()> {
        let mut state = self.state.lock().await;

        match &*state {
            TokenState::UserToken(_) => Err(AuthError::authentication(
                "user-supplied token was rejected and cannot be refreshed by the client",
            )),
            TokenState::AppToken(cached) if cached.value != rejected.value => {
                debug!("Rejected app token already replaced, keeping the cached one");
                Ok(())
            }
            _ => {
                debug!("Invalidating cached app token");
                *state = TokenState::Unauthenticated;
                Ok(())
            }
        }
    }

    /// Current state without triggering any fetch
    pub async fn state(&self) -> ProviderState {
        match &*self.state.lock().await {
            TokenState::Unauthenticated => ProviderState::Unauthenticated,
            TokenState::UserToken(_) => ProviderState::UserToken,
            TokenState::AppToken(token) if token.is_expired(self.expiry_margin) => {
                ProviderState::AppTokenExpired
            }
            TokenState::AppToken(_) => ProviderState::AppTokenValid,
        }
    }

    /// Get the currently cached token (if any)
    pub async fn cached_token(&self) -> Option<AccessToken> {
        match &*self.state.lock().await {
            TokenState::Unauthenticated => None,
            TokenState::UserToken(token) | TokenState::AppToken(token) => Some(token.clone()),
        }
    }

    /// Check the active token against Twitch.
    ///
    /// A rejected app token is dropped from the cache.
    pub async fn validate(&self) -> AuthResult<TokenValidation> {
        let token = self.get_token().await?;

        match self.grant.validate(&token.value).await {
            Err(AuthError::Authentication {
                status: Some(401),
                reason,
            }) => {
                if token.mode == TokenMode::AppGenerated {
                    self.invalidate(&token).await?;
                }
                Err(AuthError::Authentication {
                    status: Some(401),
                    reason,
                })
            }
            other => other,
        }
    }

    /// Revoke the cached app token upstream and forget it
    pub async fn revoke(&self) -> AuthResult<()> {
        let mut state = self.state.lock().await;

        match &*state {
            TokenState::UserToken(_) => Err(AuthError::authentication(
                "user-supplied tokens are owned by the caller and cannot be revoked by the client",
            )),
            TokenState::Unauthenticated => Ok(()),
            TokenState::AppToken(token) => {
                self.grant.revoke(self.client_id(), &token.value).await?;
                *state = TokenState::Unauthenticated;
                info!("App token revoked");
                Ok(())
            }
        }
    }

    async fn request_app_token(&self) -> AuthResult<AccessToken> {
        let client_secret = self.credentials.client_secret().ok_or_else(|| {
            AuthError::Configuration("client_secret is required for app access tokens".to_string())
        })?;

        debug!("Running client-credentials grant via {}", self.grant.name());
        let token = self
            .grant
            .client_credentials(self.client_id(), client_secret)
            .await?;

        info!(
            expires_at = ?token.expires_at,
            scopes = token.scopes.len(),
            "App access token obtained"
        );
        Ok(token)
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("credentials", &self.credentials)
            .field("grant", &self.grant.name())
            .field("expiry_margin", &self.expiry_margin)
            .finish_non_exhaustive()
    }
}
