//! Authentication module for Twitchy SDK
//!
//! This module provides the access-token lifecycle for Helix requests:
//! - Credential validation at construction
//! - App access tokens through the client-credentials grant, cached until expiry
//! - Caller-supplied user tokens, used as-is
//! - Request decoration and the single retry after a rejected app token

pub mod authenticator;
pub mod credentials;
pub mod grant;
pub mod provider;
pub mod types;

// Re-export commonly used types and functions
pub use authenticator::{AuthorizedRequest, RequestAuthenticator, RetryDecision};
pub use credentials::Credentials;
pub use grant::{AuthEndpoints, HttpTokenGrant, TokenGrant};
pub use provider::{ProviderState, TokenProvider};
pub use types::{parse_scopes, AccessToken, AuthError, AuthResult, TokenMode, TokenValidation};
