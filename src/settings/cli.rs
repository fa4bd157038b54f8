use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "userbase", about = "Look up users and update their preferences")]
pub struct Cli {
    /// Settings file; defaults to settings/dev.toml (debug) or settings/release.toml.
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a user by userid, e.g. acct:foo@example.com
    Fetch { userid: String },
    /// Fetch a user by username and authority
    FetchUser { username: String, authority: String },
    /// Resolve a login field (username or email) in the default authority
    Login { username_or_email: String },
    /// Update preferences, e.g. show_sidebar_tutorial=false
    Prefs {
        userid: String,
        #[arg(required = true, value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
}
