//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// TTYF - Track Your Finances: manage your Plaid connections for personal finance tracking
#[derive(Parser, Debug)]
#[command(name = "ttyf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output on stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Storage directory for connections and credentials (default: ~/.ttyf)
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,

    /// Do not print the welcome banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new financial institution connection through Plaid
    Add {
        /// Name for the connection
        name: String,
        /// Set up user credentials before connecting
        #[arg(long)]
        setup: bool,
    },

    /// List all your financial institution connections
    List,

    /// Remove a financial institution connection
    Remove {
        /// Name of the connection
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage user credentials for Plaid
    User {
        /// Set up user credentials
        #[arg(long)]
        setup: bool,
        /// Show current user credentials (default)
        #[arg(long)]
        show: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config (secret masked)
    Show,

    /// Create global config template
    Init,

    /// Show config and data file paths
    Path,
}
