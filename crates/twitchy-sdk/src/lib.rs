//! # Twitchy SDK
//!
//! Client for the Twitch Helix API that takes care of access tokens.
//!
//! A [`HelixClient`] authenticates either with a caller-supplied user OAuth
//! token or with an app access token obtained through the client-credentials
//! grant. App tokens are cached, fetched again when they expire, and retried
//! once when Helix rejects them.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod request;
pub mod types;

pub use auth::{
    AccessToken, AuthEndpoints, AuthError, AuthResult, AuthorizedRequest, Credentials,
    HttpTokenGrant, ProviderState, RequestAuthenticator, RetryDecision, TokenGrant, TokenMode,
    TokenProvider, TokenValidation,
};
pub use client::{ClientBuilder, HelixClient};
pub use config::ClientConfig;
pub use error::{ApiError, ErrorResponse, Result};
pub use request::HelixRequest;
pub use types::{HelixResponse, Page, Pagination, User};
