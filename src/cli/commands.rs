//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// homesync - Declarative sync of homelab DNS rules and private resources.
#[derive(Parser, Debug)]
#[command(name = "homesync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the integration's config.yaml.
    #[arg(short, long, global = true, env = "HOMESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Integration to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available integrations.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage ControlD DNS spoof rules.
    Controld {
        /// Path to domains.yaml (defaults to next to config.yaml).
        #[arg(long)]
        domains: Option<PathBuf>,

        /// SOPS-encrypted file holding the API token.
        #[arg(long)]
        token_file: Option<PathBuf>,

        /// Command to run.
        #[command(subcommand)]
        command: ControlDCommands,
    },

    /// Manage Pangolin private resources.
    Pangolin {
        /// Path to resources.yaml (defaults to next to config.yaml).
        #[arg(long)]
        resources: Option<PathBuf>,

        /// SOPS-encrypted file holding the API key.
        #[arg(long)]
        token_file: Option<PathBuf>,

        /// Command to run.
        #[command(subcommand)]
        command: PangolinCommands,
    },
}

/// ControlD subcommands.
#[derive(Subcommand, Debug)]
pub enum ControlDCommands {
    /// List the rules in each managed folder.
    List(ListArgs),

    /// Validate config.yaml and domains.yaml.
    Validate,

    /// Sync rules to match domains.yaml.
    Sync(SyncArgs),

    /// Delete every rule in each managed folder.
    Purge(PurgeArgs),
}

/// Pangolin subcommands.
#[derive(Subcommand, Debug)]
pub enum PangolinCommands {
    /// List the private resources of each site.
    List(ListArgs),

    /// List the clients of the organization.
    ListClients,

    /// Validate config.yaml and resources.yaml.
    Validate,

    /// Sync resources to match resources.yaml.
    Sync {
        /// Common sync flags.
        #[command(flatten)]
        sync: SyncArgs,

        /// Extra client names to associate, comma-separated.
        #[arg(long)]
        clients: Option<String>,

        /// Do not associate the configured default clients.
        #[arg(long)]
        no_default_clients: bool,

        /// Update every existing resource to re-apply client associations.
        #[arg(long, conflicts_with = "force")]
        force_client_update: bool,
    },

    /// Delete every private resource on each site.
    Purge(PurgeArgs),
}

/// Flags for `list`.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only these targets, comma-separated.
    #[arg(long)]
    pub target: Option<String>,
}

/// Flags for `sync`.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Show the plan without applying it.
    #[arg(long)]
    pub dry_run: bool,

    /// Delete and recreate every resource.
    #[arg(long)]
    pub force: bool,

    /// Only these targets, comma-separated.
    #[arg(long)]
    pub target: Option<String>,
}

/// Flags for `purge`.
#[derive(Args, Debug, Clone, Default)]
pub struct PurgeArgs {
    /// Show what would be deleted.
    #[arg(long)]
    pub dry_run: bool,

    /// Confirm the deletion.
    #[arg(long)]
    pub confirm: bool,

    /// Only these targets, comma-separated.
    #[arg(long)]
    pub target: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
