//! Request decoration and the 401 retry policy

use super::provider::TokenProvider;
use super::types::{AccessToken, AuthResult, TokenMode};
use crate::error::ApiError;
use crate::request::HelixRequest;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the application's client id
pub const CLIENT_ID_HEADER: &str = "Client-Id";

/// Header carrying the bearer token
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Request with `Client-Id` and `Authorization` attached
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedRequest {
    request: HelixRequest,
    token: AccessToken,
}

impl AuthorizedRequest {
    pub fn request(&self) -> &HelixRequest {
        &self.request
    }

    /// Token that was attached
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Mode of the token that was attached
    pub fn mode(&self) -> TokenMode {
        self.token.mode
    }

    pub fn into_request(self) -> HelixRequest {
        self.request
    }
}

/// What to do with a Helix response
#[derive(Debug)]
pub enum RetryDecision {
    /// Success status, hand the response to the caller
    Accept,
    /// The app token was invalidated; send the request once more
    Retry,
    /// Give up and return this error
    Surface(ApiError),
}

/// Attaches credentials to outbound requests
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    provider: Arc<TokenProvider>,
}

impl RequestAuthenticator {
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<TokenProvider> {
        &self.provider
    }

    /// Add `Client-Id` and `Authorization: Bearer <token>` to the request.
    ///
    /// May run a client-credentials grant when no valid app token is cached.
    pub async fn authorize(&self, mut request: HelixRequest) -> AuthResult<AuthorizedRequest> {
        let token = self.provider.get_token().await?;

        request.set_header(CLIENT_ID_HEADER, self.provider.client_id());
        request.set_header(AUTHORIZATION_HEADER, token.bearer());

        Ok(AuthorizedRequest { request, token })
    }

    /// Decide whether a response is final.
    ///
    /// A 401 on a retryable request made with an app token invalidates the
    /// token that request carried and asks for exactly one retry. Everything
    /// else is mapped onto [`ApiError`] by status class.
    pub async fn handle_response(
        &self,
        authorized: &AuthorizedRequest,
        status: StatusCode,
        body: &str,
        retryable: bool,
    ) -> RetryDecision {
        if status.is_success() {
            return RetryDecision::Accept;
        }

        if status == StatusCode::UNAUTHORIZED
            && retryable
            && authorized.mode() == TokenMode::AppGenerated
        {
            return match self.provider.invalidate(authorized.token()).await {
                Ok(()) => {
                    debug!("App token rejected, retrying with a fresh token");
                    RetryDecision::Retry
                }
                Err(e) => RetryDecision::Surface(e.into()),
            };
        }

        RetryDecision::Surface(ApiError::from_status(status, body))
    }
}
