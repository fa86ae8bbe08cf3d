//! `newsagg` - CLI for the news aggregator
//!
//! This binary collects news into JSON files or the local database, runs
//! scheduled ingestion, and queries what has been stored.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use newsagg::cli::{
    Cli, Command, ConfigCommand, DaemonCommand, DigestCommand, FetchCommand, OutputFormat,
    PruneCommand, RecentCommand, RunCommand, SearchCommand,
};
use newsagg::config::{interval_from_minutes, SummarizerBackend};
use newsagg::ingest::urls_from_text;
use newsagg::summarize::OllamaSummarizer;
use newsagg::{
    compose_digest, digest, init_logging, run_scheduled, Article, Collector, Config,
    IngestionOrchestrator, SchedulerHandle, Storage,
};

/// Exit code when `fetch` is given no URLs.
const EXIT_NO_URLS: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Validation reports a broken config instead of failing to load it.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        let path = file
            .clone()
            .or_else(|| cli.config.clone())
            .unwrap_or_else(Config::default_config_path);
        return Ok(handle_validate(path));
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Fetch(cmd) => handle_fetch(&config, cmd).await,
        Command::Run(cmd) => handle_run(&config, &cmd).await.map(|()| ExitCode::SUCCESS),
        Command::Ingest(cmd) => handle_ingest(&config, cmd.json)
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Daemon(cmd) => handle_daemon(&config, &cmd)
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Status(cmd) => handle_status(&config, cmd.json)
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Recent(cmd) => handle_recent(&config, &cmd).map(|()| ExitCode::SUCCESS),
        Command::Search(cmd) => handle_search(&config, &cmd).map(|()| ExitCode::SUCCESS),
        Command::Digest(cmd) => handle_digest(&config, &cmd).map(|()| ExitCode::SUCCESS),
        Command::Prune(cmd) => handle_prune(&config, &cmd).map(|()| ExitCode::SUCCESS),
        Command::Config(cmd) => handle_config(&config, &cmd).map(|()| ExitCode::SUCCESS),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("cannot open database {}", path.display()))
}

fn read_stdin_urls() -> anyhow::Result<Vec<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(Vec::new());
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("failed to read URLs from stdin")?;
    Ok(urls_from_text(&text))
}

async fn handle_fetch(config: &Config, cmd: FetchCommand) -> anyhow::Result<ExitCode> {
    let urls = if cmd.url.is_empty() {
        read_stdin_urls()?
    } else {
        cmd.url
    };
    if urls.is_empty() {
        eprintln!("No URLs given. Pass --url URL or pipe one URL per line on stdin.");
        return Ok(ExitCode::from(EXIT_NO_URLS));
    }

    let collector = Collector::from_config(config)?;
    let timeout = Duration::from_secs(cmd.timeout);
    let count = collector
        .process_url_list(&urls, &cmd.out, cmd.hours, Some(timeout))
        .await?;
    println!("Wrote {count} entries to {}", cmd.out.display());
    Ok(ExitCode::SUCCESS)
}

async fn handle_run(config: &Config, cmd: &RunCommand) -> anyhow::Result<()> {
    let collector = Collector::from_config(config)?;
    let hours = cmd.hours.unwrap_or(config.sources.hours);
    let timeout = cmd
        .timeout
        .map_or_else(|| config.http_timeout(), Duration::from_secs);

    let count = collector.run_default(&cmd.out, hours, Some(timeout)).await?;
    println!("Wrote {count} total entries to {}", cmd.out.display());
    Ok(())
}

async fn handle_ingest(config: &Config, json: bool) -> anyhow::Result<()> {
    let orchestrator = IngestionOrchestrator::from_config(config)?;
    let report = orchestrator.run_once().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Collected:         {}", report.collected);
        println!("New articles:      {}", report.inserted);
        println!("Duplicates:        {}", report.duplicates);
        println!("Summarized:        {}", report.summarized);
        println!("Summary failures:  {}", report.summary_failures);
        println!("Pruned:            {}", report.pruned);
    }
    Ok(())
}

async fn handle_daemon(config: &Config, cmd: &DaemonCommand) -> anyhow::Result<()> {
    let interval = match cmd.interval_minutes {
        Some(minutes) => interval_from_minutes(minutes)?,
        None => config.scheduler_interval()?,
    };

    let orchestrator = IngestionOrchestrator::from_config(config)?;
    println!(
        "Running ingestion every {} minute(s); press Ctrl-C to stop.",
        interval.as_secs() / 60
    );
    let cycles = run_scheduled(&orchestrator, interval, SchedulerHandle::new()).await;
    println!("Stopped after {cycles} cycle(s).");
    Ok(())
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    let backend = config.summarizer.backend;
    let reachable = if backend == SummarizerBackend::Ollama {
        let ollama = OllamaSummarizer::new(
            &config.summarizer.ollama_url,
            &config.summarizer.model,
            &config.summarizer.prompt_template,
            Duration::from_secs(2),
        )?;
        Some(ollama.is_healthy().await)
    } else {
        None
    };

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
            "summarizer": backend.to_string(),
            "summarizer_reachable": reachable,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("newsagg status");
        println!("--------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Articles:      {}", stats.total_articles);
        println!("Sources:       {}", stats.total_sources);
        println!("Summaries:     {}", stats.total_summaries);
        if let Some(oldest) = stats.oldest_fetch {
            println!("Oldest fetch:  {}", oldest.format("%Y-%m-%d %H:%M UTC"));
        }
        if let Some(newest) = stats.newest_fetch {
            println!("Newest fetch:  {}", newest.format("%Y-%m-%d %H:%M UTC"));
        }
        match reachable {
            Some(true) => println!("Summarizer:    {backend} (reachable)"),
            Some(false) => println!("Summarizer:    {backend} (unreachable)"),
            None => println!("Summarizer:    {backend}"),
        }
    }
    Ok(())
}

fn handle_recent(config: &Config, cmd: &RecentCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let articles = match &cmd.source {
        Some(source) => storage.by_source(source, cmd.limit)?,
        None => storage.recent(cmd.limit)?,
    };
    print_articles(&articles, cmd.format)
}

fn handle_search(config: &Config, cmd: &SearchCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let articles = storage.search(&cmd.query, cmd.source.as_deref(), cmd.limit)?;
    print_articles(&articles, cmd.format)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

fn print_articles(articles: &[Article], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(articles)?);
        return Ok(());
    }
    if articles.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => {
            println!("{:>6}  {:<16}  {:<20}  TITLE", "ID", "FETCHED", "SOURCE");
            for article in articles {
                let item = &article.item;
                println!(
                    "{:>6}  {:<16}  {:<20}  {}",
                    article.id,
                    item.fetched_at.format("%Y-%m-%d %H:%M"),
                    truncate(&item.source, 20),
                    truncate(item.title.as_deref().unwrap_or("(untitled)"), 60)
                );
            }
        }
        OutputFormat::Plain | OutputFormat::Json => {
            for article in articles {
                let item = &article.item;
                let when = item.published.unwrap_or(item.fetched_at);
                println!(
                    "[{}] {}",
                    article.id,
                    item.title.as_deref().unwrap_or("(untitled)")
                );
                println!("    {} | {}", item.source, when.format("%Y-%m-%d %H:%M UTC"));
                if let Some(link) = &item.link {
                    println!("    {link}");
                }
            }
        }
    }
    Ok(())
}

fn handle_digest(config: &Config, cmd: &DigestCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let cutoff = digest::window_start(Utc::now(), cmd.hours);
    let entries = digest::load_entries(&storage, cutoff, cmd.limit)?;
    let html = compose_digest(&entries, &cmd.title)?;

    match &cmd.out {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Wrote digest of {} article(s) to {}",
                entries.len(),
                path.display()
            );
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn handle_prune(config: &Config, cmd: &PruneCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let max_age_days = cmd.max_age_days.unwrap_or(config.storage.max_age_days);
    let keep = cmd.keep.unwrap_or(config.storage.max_articles);

    let pruned = storage.apply_retention(max_age_days, keep)?;
    println!("Pruned {pruned} article(s); {} remain.", storage.count()?);
    Ok(())
}

fn handle_validate(path: PathBuf) -> ExitCode {
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => {
            println!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Configuration error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Max articles:       {}", config.storage.max_articles);
                println!("  Max age (days):     {}", config.storage.max_age_days);
                println!();
                println!("[HTTP]");
                println!("  User agent:         {}", config.http.user_agent);
                println!("  Timeout (s):        {}", config.http.timeout_secs);
                println!("  Link timeout (s):   {}", config.http.link_timeout_secs);
                println!();
                println!("[Sources]");
                println!("  Web feeds:          {}", config.sources.web_feeds.len());
                println!(
                    "  Reddit communities: {}",
                    config.sources.reddit_communities.len()
                );
                println!("  Hours:              {}", config.sources.hours);
                println!();
                println!("[Summarizer]");
                println!("  Backend:            {}", config.summarizer.backend);
                println!("  Model:              {}", config.summarizer.model);
                println!("  Per cycle:          {}", config.summarizer.max_per_cycle);
                println!();
                println!("[Scheduler]");
                println!(
                    "  Interval (min):     {}",
                    config.scheduler.interval_minutes
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        // Handled before the configuration is loaded.
        ConfigCommand::Validate { .. } => {}
    }
    Ok(())
}
