//! Caller-supplied client identity
//!
//! Credentials are validated once at construction and never mutated
//! afterwards; cached tokens live in the token provider.

use super::types::{AuthError, AuthResult};
use std::fmt;

/// Client identity used to authenticate against Twitch
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: Option<String>,
    user_token: Option<String>,
}

impl Credentials {
    /// Validate and store the client identity.
    ///
    /// Blank secrets and tokens count as absent. Fails when the client id is
    /// blank or when neither a client secret nor a user token is available.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        user_token: Option<String>,
    ) -> AuthResult<Self> {
        let client_id = client_id.into().trim().to_string();
        if client_id.is_empty() {
            return Err(AuthError::Configuration(
                "client_id must not be empty".to_string(),
            ));
        }

        let client_secret = non_blank(client_secret);
        let user_token = non_blank(user_token);

        if client_secret.is_none() && user_token.is_none() {
            return Err(AuthError::Configuration(
                "either a client_secret or an oauth_token must be provided".to_string(),
            ));
        }

        Ok(Self {
            client_id,
            client_secret,
            user_token,
        })
    }

    /// Credentials for the client-credentials flow
    pub fn app(client_id: impl Into<String>, client_secret: impl Into<String>) -> AuthResult<Self> {
        Self::new(client_id, Some(client_secret.into()), None)
    }

    /// Credentials for a caller-owned user token
    pub fn user(client_id: impl Into<String>, user_token: impl Into<String>) -> AuthResult<Self> {
        Self::new(client_id, None, Some(user_token.into()))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn user_token(&self) -> Option<&str> {
        self.user_token.as_deref()
    }

    /// A supplied user token always wins over app-token acquisition
    pub fn prefers_user_token(&self) -> bool {
        self.user_token.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
