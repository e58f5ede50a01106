use crate::cli::handlers::create_client;
use crate::error::Result;
use crate::output::{json_output, print_field, print_info};
use console::style;
use twitchy_sdk::ClientConfig;

/// Handle `twitchy users`
pub async fn handle_users(
    config: &ClientConfig,
    ids: &[String],
    logins: &[String],
    json: bool,
) -> Result<()> {
    let client = create_client(config).await?;

    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let logins: Vec<&str> = logins.iter().map(String::as_str).collect();
    let users = client.get_users(&ids, &logins).await?;

    if json {
        return json_output(&users);
    }

    if users.is_empty() {
        print_info("No users found");
        return Ok(());
    }

    for user in &users {
        println!(
            "{} {}",
            style(&user.display_name).bold(),
            style(format!("({})", user.login)).dim()
        );
        print_field("id", &user.id);
        if !user.broadcaster_type.is_empty() {
            print_field("type", &user.broadcaster_type);
        }
        print_field("created", &user.created_at.format("%Y-%m-%d").to_string());
        if !user.description.is_empty() {
            print_field("about", &user.description);
        }
    }

    Ok(())
}
