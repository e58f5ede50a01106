//! Error types for the Twitchy CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Helix or configuration errors from the SDK
    #[error(transparent)]
    Api(#[from] twitchy_sdk::ApiError),

    /// Token lifecycle errors
    #[error(transparent)]
    Auth(#[from] twitchy_sdk::AuthError),

    /// JSON output encoding
    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
