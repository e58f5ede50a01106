//! Authentication-related types and data structures
//!
//! This module defines the token data carried through the auth module
//! together with its error type.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Where an access token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// OAuth token handed to the client by the caller
    UserSupplied,
    /// App access token obtained through the client-credentials grant
    AppGenerated,
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenMode::UserSupplied => write!(f, "user"),
            TokenMode::AppGenerated => write!(f, "app"),
        }
    }
}

/// Bearer token attached to Helix requests
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque token value
    pub value: String,
    /// How the token was obtained
    pub mode: TokenMode,
    /// Expiration time, unknown for user-supplied tokens
    pub expires_at: Option<DateTime<Utc>>,
    /// OAuth scopes granted with this token
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// Wrap a caller-supplied OAuth token.
    ///
    /// The client cannot know when a user token expires, so it is treated as
    /// never expiring until Twitch rejects it.
    pub fn user_supplied(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            mode: TokenMode::UserSupplied,
            expires_at: None,
            scopes: Vec::new(),
        }
    }

    /// Build an app token from a grant response
    pub fn app_generated(value: impl Into<String>, expires_in: u64, scopes: Vec<String>) -> Self {
        // Clamp so the chrono conversion cannot overflow on absurd lifetimes
        let lifetime = expires_in.min(u64::from(u32::MAX)) as i64;
        let expires_at = Utc::now()
            .checked_add_signed(ChronoDuration::seconds(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value: value.into(),
            mode: TokenMode::AppGenerated,
            expires_at: Some(expires_at),
            scopes,
        }
    }

    /// Check expiry against `now`, treating the token as expired `margin`
    /// before its actual expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = ChronoDuration::from_std(margin).unwrap_or(ChronoDuration::zero());
                match now.checked_add_signed(margin) {
                    Some(deadline) => deadline >= expires_at,
                    None => true,
                }
            }
            None => false,
        }
    }

    /// Check expiry against the current time
    pub fn is_expired(&self, margin: Duration) -> bool {
        self.is_expired_at(Utc::now(), margin)
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("mode", &self.mode)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Response of the token validation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Client the token was issued to
    pub client_id: String,
    /// Login of the user, absent for app tokens
    #[serde(default)]
    pub login: Option<String>,
    /// User id, absent for app tokens
    #[serde(default)]
    pub user_id: Option<String>,
    /// Scopes attached to the token
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scopes: Vec<String>,
    /// Remaining lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Split a scope string as sent by Twitch.
///
/// Scopes may be separated by whitespace or `+` (`user:edit+user:read:email`).
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == '+' || c.is_whitespace())
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accept scopes either as a JSON array or as a single joined string
pub(crate) fn deserialize_scopes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScopes {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<RawScopes>::deserialize(deserializer)? {
        Some(RawScopes::List(scopes)) => scopes,
        Some(RawScopes::Joined(joined)) => parse_scopes(&joined),
        None => Vec::new(),
    })
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Invalid or missing credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token grant failed or a token was rejected with no way to self-refresh
    #[error("Authentication failed: {reason}")]
    Authentication {
        /// Upstream HTTP status, when the failure came from Twitch
        status: Option<u16>,
        /// Upstream message or local reason
        reason: String,
    },

    /// Network error while talking to the OAuth endpoints
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid OAuth response
    #[error("Invalid OAuth response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Authentication failure without an upstream status
    pub fn authentication(reason: impl Into<String>) -> Self {
        AuthError::Authentication {
            status: None,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_token_never_expires() {
        let token = AccessToken::user_supplied("abc");
        let far_future = Utc::now() + ChronoDuration::days(3650);

        assert_eq!(token.mode, TokenMode::UserSupplied);
        assert!(!token.is_expired_at(far_future, Duration::from_secs(300)));
    }

    #[test]
    fn test_app_token_expiry_with_margin() {
        let token = AccessToken::app_generated("abc", 600, vec![]);
        let now = Utc::now();

        assert!(!token.is_expired_at(now, Duration::ZERO));
        assert!(!token.is_expired_at(now, Duration::from_secs(300)));
        assert!(token.is_expired_at(now, Duration::from_secs(600)));
        assert!(token.is_expired_at(now + ChronoDuration::seconds(601), Duration::ZERO));
    }

    #[test]
    fn test_zero_lifetime_is_expired() {
        let token = AccessToken::app_generated("abc", 0, vec![]);
        assert!(token.is_expired(Duration::ZERO));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::user_supplied("super-secret");
        let rendered = format!("{:?}", token);

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("UserSupplied"));
        assert_eq!(token.bearer(), "Bearer super-secret");
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes("user:edit+user:read:email"),
            vec!["user:edit", "user:read:email"]
        );
        assert_eq!(parse_scopes("chat:read  chat:edit"), vec!["chat:read", "chat:edit"]);
        assert!(parse_scopes("").is_empty());
    }

    #[test]
    fn test_validation_accepts_both_scope_shapes() {
        let listed: TokenValidation = serde_json::from_str(
            r#"{"client_id":"cid","scopes":["a","b"],"expires_in":100}"#,
        )
        .unwrap();
        let joined: TokenValidation =
            serde_json::from_str(r#"{"client_id":"cid","scopes":"a+b"}"#).unwrap();
        let missing: TokenValidation =
            serde_json::from_str(r#"{"client_id":"cid","scopes":null}"#).unwrap();

        assert_eq!(listed.scopes, vec!["a", "b"]);
        assert_eq!(joined.scopes, vec!["a", "b"]);
        assert!(missing.scopes.is_empty());
        assert_eq!(listed.expires_in, Some(100));
    }
}
