//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Fetch command arguments.
#[derive(Debug, Args)]
pub struct FetchCommand {
    /// URL to fetch (repeatable); read one per line from stdin when omitted
    #[arg(short, long, value_name = "URL")]
    pub url: Vec<String>,

    /// Only keep feed entries from the last N hours
    #[arg(long, default_value = "24")]
    pub hours: u32,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    pub timeout: u64,

    /// Output JSON file
    #[arg(short, long, default_value = "recent.json")]
    pub out: PathBuf,
}

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Output JSON file
    #[arg(short, long, default_value = "combined_recent.json")]
    pub out: PathBuf,

    /// Only keep feed entries from the last N hours (default from config)
    #[arg(long)]
    pub hours: Option<u32>,

    /// Request timeout in seconds (default from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Ingest command arguments.
#[derive(Debug, Args)]
pub struct IngestCommand {
    /// Output the cycle report as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Daemon command arguments.
#[derive(Debug, Args)]
pub struct DaemonCommand {
    /// Minutes between cycles (default from config)
    #[arg(short, long)]
    pub interval_minutes: Option<u64>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Recent command arguments.
#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Number of articles to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Only show articles from this source
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// The search query (matches title and content)
    pub query: String,

    /// Only search articles from this source
    #[arg(short, long)]
    pub source: Option<String>,

    /// Maximum number of results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Digest command arguments.
#[derive(Debug, Args)]
pub struct DigestCommand {
    /// Include articles from the last N hours
    #[arg(long, default_value = "24")]
    pub hours: u32,

    /// Maximum number of articles
    #[arg(short, long, default_value = "100")]
    pub limit: usize,

    /// Digest title
    #[arg(long, default_value = "News digest")]
    pub title: String,

    /// Write the HTML to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Prune command arguments.
#[derive(Debug, Args)]
pub struct PruneCommand {
    /// Delete articles older than this many days (default from config, 0 = off)
    #[arg(long)]
    pub max_age_days: Option<u32>,

    /// Keep at most this many articles (default from config, 0 = off)
    #[arg(long)]
    pub keep: Option<usize>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for article listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
