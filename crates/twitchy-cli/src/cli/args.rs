use crate::cli::{
    commands::{Commands, ConfigAction},
    handlers,
};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::PathBuf;
use twitchy_sdk::ClientConfig;

/// Twitchy CLI - Twitch Helix access from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "twitchy",
    author = "Twitchy Team",
    version,
    about = "Twitchy CLI - Twitch Helix access from the terminal",
    long_about = "Command-line client for the Twitch Helix API.

Credentials come from flags, TWITCHY_* environment variables or twitchy.toml.
With --oauth-token the given user token is used as-is; otherwise an app
access token is obtained with the client id and secret.

EXAMPLES:
  twitchy token                       # Obtain a token, masked
  twitchy validate                    # Check the active token
  twitchy users --login twitchdev     # Look up a user
  twitchy config example > twitchy.toml"
)]
pub struct Args {
    /// Configuration file path (defaults to ./twitchy.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Twitch application client id
    #[arg(long, global = true, env = "TWITCHY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Application secret for app access tokens
    #[arg(long, global = true, env = "TWITCHY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// User OAuth token, takes precedence over the client secret
    #[arg(long, global = true, env = "TWITCHY_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        // Printing the example must not depend on a valid config
        if let Commands::Config {
            action: ConfigAction::Example,
        } = self.command
        {
            return handlers::config::handle_example();
        }

        let config = self.resolve_config()?;

        match self.command {
            Commands::Token { show } => handlers::token::handle_token(&config, show, self.json).await,
            Commands::Validate => handlers::validate::handle_validate(&config, self.json).await,
            Commands::Users { ids, logins } => {
                handlers::users::handle_users(&config, &ids, &logins, self.json).await
            }
            Commands::Config { action } => handlers::config::handle_config(action, &config, self.json),
        }
    }

    /// Load the config file and environment, then apply credential flags
    pub fn resolve_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load(self.config.as_deref())?;

        if let Some(client_id) = &self.client_id {
            config.client_id = Some(client_id.clone());
        }
        if let Some(client_secret) = &self.client_secret {
            config.client_secret = Some(client_secret.clone());
        }
        if let Some(oauth_token) = &self.oauth_token {
            config.oauth_token = Some(oauth_token.clone());
        }

        Ok(config)
    }
}
