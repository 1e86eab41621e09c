use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostca")]
#[command(version = "1.0.0")]
#[command(about = "Issue and inspect host certificates from local certificate authorities")]
#[command(long_about = None)]
pub struct Cli {
    /// Authority config file (default: $HOSTCA_CONFIG or ~/.config/hostca/authorities.yaml)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more verbosity: -v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw tab-separated values (no formatting)
    #[arg(short, long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue a new host certificate and print it as PEM
    Issue {
        /// Authority name (use 'hostca authorities' to see configured ones)
        #[arg(value_hint = clap::ValueHint::Other)]
        authority: String,
        /// Hostname, used as the certificate's Common Name
        hostname: String,
        /// Contact email of the requester
        #[arg(long)]
        email: Option<String>,
        /// Additional DNS name (repeatable)
        #[arg(long = "alt-name")]
        alt_names: Vec<String>,
        /// Authenticated caller
        #[arg(long, env = "REMOTE_USER")]
        user: Option<String>,
    },
    /// Show details of an issued certificate
    Show {
        /// Authority name
        #[arg(value_hint = clap::ValueHint::Other)]
        authority: String,
        /// Hostname
        hostname: String,
        /// Print the PEM instead of the details
        #[arg(long)]
        pem: bool,
    },
    /// List issued certificates (all authorities if not specified)
    List {
        /// Authority name (lists all authorities if not provided)
        #[arg(value_hint = clap::ValueHint::Other)]
        authority: Option<String>,
        /// Columns to display (comma-separated): cn,serial,not_before,not_after,sans,key_usage,extended_key_usage,issuer,authority,fingerprint,expired. Use +column to append to defaults.
        #[arg(long)]
        columns: Option<String>,
    },
    /// List configured authorities
    Authorities,
    /// Check that an issued certificate was signed by its authority
    Verify {
        /// Authority name
        #[arg(value_hint = clap::ValueHint::Other)]
        authority: String,
        /// Hostname
        hostname: String,
    },
    /// Generate shell completion script
    Completion {
        /// Target shell
        shell: Shell,
    },
    /// Internal completion helpers (hidden)
    #[command(hide = true)]
    CompletionHelper {
        #[command(subcommand)]
        command: CompletionHelperCommands,
    },
}

#[derive(Subcommand)]
pub enum CompletionHelperCommands {
    /// List authority names for completion
    Authorities,
    /// List column names for completion
    Columns,
}
