//! Client configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `TWITCHY_`-prefixed environment variables.

use crate::auth::AuthEndpoints;
use crate::error::{ApiError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Helix base URL
pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "twitchy.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TWITCHY_";

/// Configuration for a [`HelixClient`](crate::HelixClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Twitch application client id
    pub client_id: Option<String>,

    /// Application secret, enables app access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Pre-obtained user OAuth token, takes precedence over the secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,

    /// Helix base URL
    pub base_url: String,

    /// OAuth endpoints
    pub auth: AuthEndpoints,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Refresh app tokens this many seconds before they expire
    pub expiry_margin_secs: u64,

    /// Re-dispatch attempts after a 429
    pub max_rate_limit_retries: u32,

    /// Upper bound for a single rate-limit wait in seconds
    pub max_rate_limit_wait_secs: u64,

    /// Fetch the app token while building the client
    pub eager_auth: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            oauth_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth: AuthEndpoints::default(),
            timeout_secs: 30,
            expiry_margin_secs: 300,
            max_rate_limit_retries: 3,
            max_rate_limit_wait_secs: 60,
            eager_auth: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit path must exist; without one, `twitchy.toml` in the
    /// working directory is used when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));

        match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ApiError::Configuration {
                        message: format!("Config file not found: {}", path.display()),
                    });
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ApiError::Configuration {
            message: format!("Failed to load configuration: {e}"),
        })
    }

    /// Load from the environment and the default file only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String> {
        let config = Self {
            client_id: Some("your-client-id".to_string()),
            client_secret: Some("your-client-secret".to_string()),
            ..Self::default()
        };
        toml::to_string_pretty(&config).map_err(|e| ApiError::Configuration {
            message: format!("Failed to serialize config: {e}"),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn expiry_margin(&self) -> Duration {
        Duration::from_secs(self.expiry_margin_secs)
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }
}
