use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedwatch")]
#[command(about = "RSS/Atom feed poller with deduplicated Gotify push notifications")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a feed URL to watch
    Add {
        /// Feed URL to add
        url: String,
    },

    /// Remove a feed by id
    Remove {
        /// Feed id as shown by `list`
        id: u64,
    },

    /// List watched feeds
    List,

    /// Show the Gotify client token, or set it when one is given
    Token {
        /// New client token to store
        token: Option<String>,
    },

    /// Poll all feeds once and notify new items
    Run {
        /// Dry run - don't send notifications, just show what would be sent
        #[arg(long)]
        dry_run: bool,
    },

    /// Poll immediately, then keep polling on the configured interval
    Watch,
}
