use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Obtain an access token and show its details
    Token {
        /// Print the full token instead of a masked one
        #[arg(long)]
        show: bool,
    },

    /// Validate the active token against Twitch
    Validate,

    /// Look up users by id and/or login
    Users {
        /// User id (repeatable)
        #[arg(long = "id", value_name = "ID", required_unless_present = "logins")]
        ids: Vec<String>,

        /// User login (repeatable)
        #[arg(long = "login", value_name = "LOGIN")]
        logins: Vec<String>,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print an example configuration file
    Example,

    /// Show the resolved configuration with secrets masked
    Show,
}
