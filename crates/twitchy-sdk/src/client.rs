//! HTTP client for the Twitch Helix API
//!
//! Each [`HelixClient`] owns its credentials and token cache; nothing is
//! shared between client instances.
//!
//! # Authentication
//!
//! - With an OAuth token, the token is sent as-is. When Twitch rejects it
//!   the error is returned, since only the user can issue a new one.
//! - With a client secret, an app access token is obtained through the
//!   client-credentials grant, cached until it expires and fetched again
//!   once if Helix answers 401.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use twitchy_sdk::{ClientBuilder, HelixClient};
//!
//! # async fn example() -> twitchy_sdk::Result<()> {
//! // App access token via client credentials
//! let client = ClientBuilder::default()
//!     .client_id("my-client-id")
//!     .client_secret("my-client-secret")
//!     .build()?;
//!
//! // Or a user token obtained elsewhere
//! let client = HelixClient::new("my-client-id", None, Some("user-oauth-token".into()))?;
//!
//! let users = client.get_users(&[], &["twitchdev"]).await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{
    AuthEndpoints, AuthorizedRequest, Credentials, HttpTokenGrant, RequestAuthenticator,
    RetryDecision, TokenGrant, TokenProvider, TokenValidation,
};
use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::{ApiError, Result};
use crate::rate_limit::RateLimitTracker;
use crate::request::HelixRequest;
use crate::types::{HelixResponse, Page, User};
use futures::stream::{self, Stream};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of re-dispatches after a 429
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Default cap for a single rate-limit wait
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Most ids and logins `GET /users` accepts in one call
pub const MAX_USERS_PER_REQUEST: usize = 100;

/// Largest `first` page size Helix accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// HTTP client for interacting with the Helix API
#[derive(Debug)]
pub struct HelixClient {
    http_client: reqwest::Client,
    base_url: String,
    authenticator: RequestAuthenticator,
    rate_limits: RateLimitTracker,
    max_rate_limit_retries: u32,
}

impl HelixClient {
    /// Create a client from a client id plus a client secret and/or a user
    /// OAuth token. The user token wins when both are given.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        oauth_token: Option<String>,
    ) -> Result<Self> {
        let mut builder = ClientBuilder::default().client_id(client_id);
        if let Some(secret) = client_secret {
            builder = builder.client_secret(secret);
        }
        if let Some(token) = oauth_token {
            builder = builder.oauth_token(token);
        }
        builder.build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_provider(&self) -> &Arc<TokenProvider> {
        self.authenticator.provider()
    }

    pub fn authenticator(&self) -> &RequestAuthenticator {
        &self.authenticator
    }

    pub fn rate_limits(&self) -> &RateLimitTracker {
        &self.rate_limits
    }

    /// Validate the active token against Twitch
    pub async fn validate_token(&self) -> Result<TokenValidation> {
        Ok(self.token_provider().validate().await?)
    }

    // ===== Users =====

    /// Look up users by id and/or login
    pub async fn get_users(&self, ids: &[&str], logins: &[&str]) -> Result<Vec<User>> {
        if ids.is_empty() && logins.is_empty() {
            return Err(ApiError::InvalidRequest {
                message: "at least one user id or login is required".into(),
            });
        }
        if ids.len() + logins.len() > MAX_USERS_PER_REQUEST {
            return Err(ApiError::InvalidRequest {
                message: format!(
                    "at most {MAX_USERS_PER_REQUEST} ids and logins can be requested at once"
                ),
            });
        }

        let request = HelixRequest::get("users")
            .query_all("id", ids.iter().copied())
            .query_all("login", logins.iter().copied());

        let response: HelixResponse<User> = self.send_json(request).await?;
        Ok(response.data)
    }

    // ===== Generic requests =====

    /// Generic GET request deserializing the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = query
            .iter()
            .fold(HelixRequest::get(path), |request, (key, value)| {
                request.query(*key, *value)
            });
        self.send_json(request).await
    }

    /// Send a request and deserialize the JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: HelixRequest) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ===== Pagination =====

    /// Fetch one page of a cursor-paginated endpoint.
    ///
    /// `first` sets the page size (1 to 100); Helix defaults to 20.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        mut request: HelixRequest,
        page: &Page,
        first: Option<u32>,
    ) -> Result<HelixResponse<T>> {
        if let Some(first) = first {
            if first == 0 || first > MAX_PAGE_SIZE {
                return Err(ApiError::InvalidRequest {
                    message: format!("page size must be between 1 and {MAX_PAGE_SIZE}, got {first}"),
                });
            }
            request.set_query("first", first.to_string());
        }

        request.remove_query("after");
        request.remove_query("before");
        match page {
            Page::First => {}
            Page::After(cursor) => request.set_query("after", cursor.as_str()),
            Page::Before(cursor) => request.set_query("before", cursor.as_str()),
        }

        self.send_json(request).await
    }

    /// Walk forward through every page, following `after` cursors until
    /// Helix returns an empty pagination object
    pub fn pages<'a, T>(
        &'a self,
        request: HelixRequest,
        first: Option<u32>,
    ) -> impl Stream<Item = Result<HelixResponse<T>>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        stream::try_unfold(Some(Page::First), move |page| {
            let request = request.clone();
            async move {
                let Some(page) = page else {
                    return Ok::<_, ApiError>(None);
                };
                let response: HelixResponse<T> = self.get_page(request, &page, first).await?;
                let next = Page::next(&response);
                Ok(Some((response, next)))
            }
        })
    }

    /// Send an authenticated request.
    ///
    /// A 401 on an app token triggers one retry with a freshly fetched
    /// token; a second 401 is returned as an authentication error.
    pub async fn send(&self, request: HelixRequest) -> Result<Response> {
        let mut retryable = true;

        loop {
            let authorized = self.authenticator.authorize(request.clone()).await?;
            let response = self.dispatch(&authorized).await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await?;
            match self
                .authenticator
                .handle_response(&authorized, status, &body, retryable)
                .await
            {
                RetryDecision::Retry => {
                    info!(
                        "Helix rejected app token for {} {}, retrying once",
                        request.method(),
                        request.path()
                    );
                    retryable = false;
                }
                RetryDecision::Surface(err) => return Err(err),
                RetryDecision::Accept => {
                    return Err(ApiError::InvalidResponse {
                        message: format!("Unexpected status {status}"),
                    })
                }
            }
        }
    }

    // ===== Private Helper Methods =====

    /// Send one authorized request, honouring rate limits and re-dispatching
    /// after 429s up to the configured limit
    async fn dispatch(&self, authorized: &AuthorizedRequest) -> Result<Response> {
        let mut rate_limited = 0;

        loop {
            self.rate_limits.wait_for_reset().await;

            let request = authorized.request();
            debug!("Dispatching {} {}", request.method(), request.path());
            let response = self.build_request(request).send().await?;
            self.rate_limits.record(response.headers()).await;

            if response.status() != StatusCode::TOO_MANY_REQUESTS
                || rate_limited >= self.max_rate_limit_retries
            {
                return Ok(response);
            }

            rate_limited += 1;
            warn!(
                "Rate limited by Helix, retrying ({}/{})",
                rate_limited, self.max_rate_limit_retries
            );
            self.rate_limits.wait_after_rejection().await;
        }
    }

    fn build_request(&self, request: &HelixRequest) -> RequestBuilder {
        let mut builder = self
            .http_client
            .request(request.method().clone(), request.url(&self.base_url));

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        builder
    }
}

/// Builder for constructing a HelixClient with custom configuration
#[derive(Default)]
pub struct ClientBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    oauth_token: Option<String>,
    base_url: Option<String>,
    auth_endpoints: Option<AuthEndpoints>,
    timeout: Option<Duration>,
    expiry_margin: Option<Duration>,
    max_rate_limit_retries: Option<u32>,
    max_rate_limit_wait: Option<Duration>,
    grant: Option<Arc<dyn TokenGrant>>,
}

impl ClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            oauth_token: config.oauth_token.clone(),
            base_url: Some(config.base_url.clone()),
            auth_endpoints: Some(config.auth.clone()),
            timeout: Some(config.timeout()),
            expiry_margin: Some(config.expiry_margin()),
            max_rate_limit_retries: Some(config.max_rate_limit_retries),
            max_rate_limit_wait: Some(config.max_rate_limit_wait()),
            grant: None,
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Use a caller-owned user token instead of app access tokens
    pub fn oauth_token(mut self, oauth_token: impl Into<String>) -> Self {
        self.oauth_token = Some(oauth_token.into());
        self
    }

    /// Set the Helix base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the OAuth endpoints
    pub fn auth_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.auth_endpoints = Some(endpoints);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Treat app tokens as expired this long before their actual expiry
    pub fn expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = Some(margin);
        self
    }

    pub fn max_rate_limit_retries(mut self, retries: u32) -> Self {
        self.max_rate_limit_retries = Some(retries);
        self
    }

    pub fn max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = Some(wait);
        self
    }

    /// Replace the OAuth collaborator
    pub fn grant(mut self, grant: Arc<dyn TokenGrant>) -> Self {
        self.grant = Some(grant);
        self
    }

    /// Build the client. No request is made; the first app token is fetched
    /// lazily.
    pub fn build(self) -> Result<HelixClient> {
        let credentials =
            Credentials::new(self.client_id.unwrap_or_default(), self.client_secret, self.oauth_token)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url).map_err(|e| ApiError::Configuration {
            message: format!("Invalid base URL {base_url}: {e}"),
        })?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::HttpClient)?;

        let grant: Arc<dyn TokenGrant> = match self.grant {
            Some(grant) => grant,
            None => Arc::new(HttpTokenGrant::with_client(
                http_client.clone(),
                self.auth_endpoints.unwrap_or_default(),
            )),
        };

        let provider = TokenProvider::new(
            credentials,
            grant,
            self.expiry_margin
                .unwrap_or(TokenProvider::DEFAULT_EXPIRY_MARGIN),
        );

        Ok(HelixClient {
            http_client,
            base_url,
            authenticator: RequestAuthenticator::new(Arc::new(provider)),
            rate_limits: RateLimitTracker::new(
                self.max_rate_limit_wait
                    .unwrap_or(DEFAULT_MAX_RATE_LIMIT_WAIT),
            ),
            max_rate_limit_retries: self
                .max_rate_limit_retries
                .unwrap_or(DEFAULT_MAX_RATE_LIMIT_RETRIES),
        })
    }

    /// Build the client and fetch the app token right away, so bad
    /// credentials fail here instead of on the first request
    pub async fn connect(self) -> Result<HelixClient> {
        let client = self.build()?;

        if !client.token_provider().is_user_token() {
            client.token_provider().get_token().await?;
        }

        Ok(client)
    }
}
