use crate::cli::commands::ConfigAction;
use crate::error::Result;
use crate::output::{json_output, mask_token};
use color_eyre::eyre::WrapErr;
use twitchy_sdk::ClientConfig;

/// Handle `twitchy config <action>`
pub fn handle_config(action: ConfigAction, config: &ClientConfig, json: bool) -> Result<()> {
    match action {
        ConfigAction::Example => handle_example(),
        ConfigAction::Show => handle_show(config, json),
    }
}

/// Print an example `twitchy.toml`
pub fn handle_example() -> Result<()> {
    print!("{}", ClientConfig::generate_example()?);
    Ok(())
}

fn handle_show(config: &ClientConfig, json: bool) -> Result<()> {
    let masked = masked_config(config);

    if json {
        return json_output(&masked);
    }

    let rendered =
        toml::to_string_pretty(&masked).wrap_err("Failed to render configuration as TOML")?;
    print!("{rendered}");
    Ok(())
}

/// Copy of the config with secrets masked
pub fn masked_config(config: &ClientConfig) -> ClientConfig {
    ClientConfig {
        client_secret: config.client_secret.as_deref().map(mask_token),
        oauth_token: config.oauth_token.as_deref().map(mask_token),
        ..config.clone()
    }
}
