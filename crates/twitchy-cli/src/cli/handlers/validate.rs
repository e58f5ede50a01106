use crate::cli::handlers::create_client;
use crate::error::Result;
use crate::output::{format_scopes, json_output, print_field, print_success};
use twitchy_sdk::ClientConfig;

/// Handle `twitchy validate`
pub async fn handle_validate(config: &ClientConfig, json: bool) -> Result<()> {
    let client = create_client(config).await?;
    let validation = client.validate_token().await?;

    if json {
        return json_output(&validation);
    }

    print_success("Token is valid");
    print_field("mode", &client.token_provider().mode().to_string());
    print_field("client id", &validation.client_id);
    if let Some(login) = &validation.login {
        print_field("login", login);
    }
    if let Some(user_id) = &validation.user_id {
        print_field("user id", user_id);
    }
    if let Some(expires_in) = validation.expires_in {
        print_field("expires in", &format!("{expires_in}s"));
    }
    print_field("scopes", &format_scopes(&validation.scopes));

    Ok(())
}
