//! Command handlers for the Twitchy CLI

pub mod config;
pub mod token;
pub mod users;
pub mod validate;

use crate::error::Result;
use tracing::debug;
use twitchy_sdk::{ClientBuilder, ClientConfig, HelixClient};

/// Build a Helix client from the resolved configuration.
///
/// With `eager_auth` the app token is fetched up front so bad credentials
/// are reported before any Helix call.
pub async fn create_client(config: &ClientConfig) -> Result<HelixClient> {
    debug!("Building Helix client for {}", config.base_url);
    let builder = ClientBuilder::from_config(config);
    let client = if config.eager_auth {
        builder.connect().await?
    } else {
        builder.build()?
    };
    Ok(client)
}
