use crate::cli::handlers::create_client;
use crate::error::Result;
use crate::output::{format_scopes, json_output, mask_token, print_field, print_success};
use chrono::{DateTime, Utc};
use serde::Serialize;
use twitchy_sdk::{AccessToken, ClientConfig};

/// Token details as printed by `twitchy token`
#[derive(Debug, Serialize)]
pub struct TokenOutput {
    pub mode: String,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

impl TokenOutput {
    pub fn new(token: &AccessToken, show: bool) -> Self {
        Self {
            mode: token.mode.to_string(),
            token: if show {
                token.value.clone()
            } else {
                mask_token(&token.value)
            },
            expires_at: token.expires_at,
            scopes: token.scopes.clone(),
        }
    }
}

/// Handle `twitchy token`
pub async fn handle_token(config: &ClientConfig, show: bool, json: bool) -> Result<()> {
    let client = create_client(config).await?;
    let token = client.token_provider().get_token().await?;
    let output = TokenOutput::new(&token, show);

    if json {
        return json_output(&output);
    }

    print_success(&format!("Obtained {} access token", output.mode));
    print_field("token", &output.token);
    print_field(
        "expires",
        &output
            .expires_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    print_field("scopes", &format_scopes(&output.scopes));

    Ok(())
}
