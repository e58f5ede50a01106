//! Error types for the Twitchy SDK

use crate::auth::grant::upstream_reason;
use crate::auth::AuthError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Helix API calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid or missing credentials/settings, never retried
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Token grant failed or the token was rejected (401/403)
    #[error("Authentication error: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
    },

    /// 4xx other than 401/403
    #[error("Request rejected with status {status}: {message}")]
    ClientRequest { status: u16, message: String },

    /// 5xx from Helix
    #[error("Server error with status {status}: {message}")]
    Server { status: u16, message: String },

    /// Request could not be built from the given arguments
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Network failure while talking to the OAuth server
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Unexpected response shape or status
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body returned by Twitch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    /// Map a non-success Helix status onto the error taxonomy
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = upstream_reason(status, body);
        let code = status.as_u16();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Authentication {
                status: Some(code),
                message,
            },
            s if s.is_client_error() => ApiError::ClientRequest {
                status: code,
                message,
            },
            s if s.is_server_error() => ApiError::Server {
                status: code,
                message,
            },
            _ => ApiError::InvalidResponse {
                message: format!("Unexpected status {code}: {message}"),
            },
        }
    }

    /// Upstream HTTP status, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { status, .. } => *status,
            ApiError::ClientRequest { status, .. } | ApiError::Server { status, .. } => {
                Some(*status)
            }
            ApiError::HttpClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, ApiError::Authentication { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::ClientRequest { status: 429, .. })
    }

    /// Check if a caller-side retry could succeed. The SDK itself only
    /// retries 401s for app tokens and 429s.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Server { .. } | ApiError::Transport { .. } => true,
            ApiError::HttpClient(e) => e.is_timeout() || e.is_connect(),
            other => other.is_rate_limited(),
        }
    }

    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Configuration { .. } => "TWITCHY_CONFIG_ERROR",
            ApiError::Authentication { .. } => "TWITCHY_AUTH_ERROR",
            ApiError::ClientRequest { .. } => "TWITCHY_CLIENT_REQUEST_ERROR",
            ApiError::Server { .. } => "TWITCHY_SERVER_ERROR",
            ApiError::InvalidRequest { .. } => "TWITCHY_INVALID_REQUEST",
            ApiError::Transport { .. } => "TWITCHY_TRANSPORT_ERROR",
            ApiError::HttpClient(_) => "TWITCHY_HTTP_CLIENT_ERROR",
            ApiError::InvalidResponse { .. } => "TWITCHY_INVALID_RESPONSE",
            ApiError::Serialization(_) => "TWITCHY_SERIALIZATION_ERROR",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Configuration(message) => ApiError::Configuration { message },
            AuthError::Authentication { status, reason } => ApiError::Authentication {
                status,
                message: reason,
            },
            AuthError::Network(message) => ApiError::Transport { message },
            AuthError::InvalidResponse(message) => ApiError::InvalidResponse { message },
        }
    }
}
