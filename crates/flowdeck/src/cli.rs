//! Clap derive structures for the `flowdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use flowdeck_core::FlowColumn;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// flowdeck -- inspect and drive an intercepting proxy's flow list
#[derive(Debug, Parser)]
#[command(
    name = "flowdeck",
    version,
    about = "Inspect and manage intercepted flows from the command line",
    long_about = "A CLI for the flows REST API of an intercepting proxy.\n\n\
        Lists flows through the same filter/sort session the interactive\n\
        front ends use, and drives per-flow and bulk actions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "FLOWDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 's', env = "FLOWDECK_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token
    #[arg(long, env = "FLOWDECK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLOWDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FLOWDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FLOWDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect, and act on intercepted flows
    #[command(alias = "f")]
    Flows(FlowsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FLOWS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FlowsArgs {
    #[command(subcommand)]
    pub command: FlowsCommand,
}

#[derive(Debug, Subcommand)]
pub enum FlowsCommand {
    /// List flows in display order
    #[command(alias = "ls")]
    List(FlowListArgs),

    /// Show one flow
    Get {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Resume an intercepted flow
    Accept {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Delete a flow
    #[command(alias = "rm")]
    Delete {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Duplicate a flow
    Duplicate {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Replay a flow's request
    Replay {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Revert a modified flow
    Revert {
        /// Flow ID or unique ID prefix
        id: String,
    },

    /// Apply a partial update from a JSON file
    Update {
        /// Flow ID or unique ID prefix
        id: String,

        /// JSON document sent verbatim as the update body
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Resume every intercepted flow
    AcceptAll,

    /// Remove every flow from the server
    Clear,

    /// Export all flows as a dump file
    Download {
        /// Destination file
        #[arg(long, short = 'O')]
        output_file: PathBuf,
    },

    /// Import flows from a dump file
    Upload {
        /// Dump file produced by `flows download`
        file: PathBuf,
    },
}

/// Filter, sort and paging for `flows list`.
#[derive(Debug, Args)]
pub struct FlowListArgs {
    /// Filter expression, e.g. "method:post host:example.com !status:2xx"
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Column to sort by (id, method, host, path, status, size, time, kind)
    #[arg(long)]
    pub sort: Option<FlowColumn>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Maximum rows to show
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (tokens masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token in the system keyring
    SetToken {
        /// Profile to store the token for (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
