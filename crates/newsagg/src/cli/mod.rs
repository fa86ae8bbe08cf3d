//! Command-line interface for newsagg.
//!
//! This module provides the CLI structure for the `newsagg` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DaemonCommand, DigestCommand, FetchCommand, IngestCommand, OutputFormat,
    PruneCommand, RecentCommand, RunCommand, SearchCommand, StatusCommand,
};

/// newsagg - collect and summarize news from feeds, Reddit and X
///
/// Fetches RSS/Atom feeds, subreddits, Reddit posts, X statuses and plain
/// web pages, stores them locally and summarizes them.
#[derive(Debug, Parser)]
#[command(name = "newsagg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the given URLs (or URLs read from stdin) into a JSON file
    Fetch(FetchCommand),

    /// Fetch the configured feeds and communities into a JSON file
    Run(RunCommand),

    /// Run one ingestion cycle into the database
    Ingest(IngestCommand),

    /// Run ingestion cycles on a schedule in the foreground
    Daemon(DaemonCommand),

    /// Show database and summarizer status
    Status(StatusCommand),

    /// List recently fetched articles
    Recent(RecentCommand),

    /// Search stored articles
    Search(SearchCommand),

    /// Write an HTML digest of recent articles
    Digest(DigestCommand),

    /// Remove old articles
    Prune(PruneCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "newsagg");
    }

    #[test]
    fn test_verbosity() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["newsagg", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["newsagg", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["newsagg", "-vv", "status"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["newsagg", "-q", "-v", "status"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_fetch_defaults() {
        let cli = parse(&["newsagg", "fetch"]);
        let Command::Fetch(cmd) = cli.command else {
            panic!("expected fetch");
        };
        assert!(cmd.url.is_empty());
        assert_eq!(cmd.hours, 24);
        assert_eq!(cmd.timeout, 10);
        assert_eq!(cmd.out, PathBuf::from("recent.json"));
    }

    #[test]
    fn test_parse_fetch_repeated_urls() {
        let cli = parse(&[
            "newsagg",
            "fetch",
            "--url",
            "https://a.example/feed",
            "--url",
            "r/science",
            "--hours",
            "6",
        ]);
        let Command::Fetch(cmd) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(cmd.url, vec!["https://a.example/feed", "r/science"]);
        assert_eq!(cmd.hours, 6);
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = parse(&["newsagg", "run"]);
        let Command::Run(cmd) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(cmd.out, PathBuf::from("combined_recent.json"));
        assert!(cmd.hours.is_none());
    }

    #[test]
    fn test_parse_search() {
        let cli = parse(&["newsagg", "search", "mars", "--source", "reddit:space", "-l", "5"]);
        let Command::Search(cmd) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(cmd.query, "mars");
        assert_eq!(cmd.source.as_deref(), Some("reddit:space"));
        assert_eq!(cmd.limit, 5);
        assert_eq!(cmd.format, OutputFormat::Plain);
    }

    #[test]
    fn test_parse_recent_and_daemon() {
        let cli = parse(&["newsagg", "recent", "-n", "3", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Recent(RecentCommand {
                limit: 3,
                format: OutputFormat::Json,
                ..
            })
        ));

        let cli = parse(&["newsagg", "daemon", "--interval-minutes", "15"]);
        assert!(matches!(
            cli.command,
            Command::Daemon(DaemonCommand {
                interval_minutes: Some(15)
            })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["newsagg", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_subcommands() {
        assert!(matches!(
            parse(&["newsagg", "config", "path"]).command,
            Command::Config(ConfigCommand::Path)
        ));
        assert!(matches!(
            parse(&["newsagg", "config", "show", "--json"]).command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }
}
