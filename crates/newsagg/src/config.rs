//! Configuration management for newsagg.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "newsagg";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "news.db";

/// Longest accepted scheduler interval: one year.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Placeholder substituted with article text in the summarizer prompt.
pub const PROMPT_TEXT_PLACEHOLDER: &str = "{text}";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `NEWSAGG_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/newsagg/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// HTTP client configuration.
    pub http: HttpConfig,
    /// Source lists and ingestion window.
    pub sources: SourcesConfig,
    /// Summarizer configuration.
    pub summarizer: SummarizerConfig,
    /// Scheduler configuration.
    pub scheduler: SchedulerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/newsagg/news.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of articles to retain.
    /// Set to 0 for unlimited.
    pub max_articles: usize,
    /// Maximum age of articles to retain in days.
    /// Set to 0 for unlimited.
    pub max_age_days: u32,
}

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Default request timeout in seconds.
    pub timeout_secs: u64,
    /// Timeout in seconds for fetching pages linked from Reddit posts.
    pub link_timeout_secs: u64,
}

/// What to ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// RSS/Atom feeds or web pages.
    pub web_feeds: Vec<String>,
    /// Subreddit URLs (or `r/name` shorthands).
    pub reddit_communities: Vec<String>,
    /// How many hours back feed entries are collected.
    pub hours: u32,
    /// Number of posts requested per subreddit.
    pub reddit_limit: u32,
    /// Base URL of the Reddit JSON API.
    pub reddit_base_url: String,
    /// X/Twitter oEmbed endpoint.
    pub x_oembed_endpoint: String,
}

/// Which summarizer implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    /// Local Ollama server.
    Ollama,
    /// Lead-sentence extraction, no model required.
    Extractive,
    /// Do not summarize.
    None,
}

impl std::fmt::Display for SummarizerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Extractive => write!(f, "extractive"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Summarizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Backend to use.
    pub backend: SummarizerBackend,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Ollama model name.
    pub model: String,
    /// Prompt sent to the model; must contain `{text}`.
    pub prompt_template: String,
    /// Request timeout for the model in seconds.
    pub timeout_secs: u64,
    /// Sentences kept by the extractive backend.
    pub max_sentences: usize,
    /// Articles summarized per ingestion cycle.
    pub max_per_cycle: usize,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minutes between ingestion cycles.
    pub interval_minutes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_articles: 50_000,
            max_age_days: 90,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "newsagg/{} (+https://example.local)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 10,
            link_timeout_secs: 5,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            web_feeds: vec!["https://www.bbc.com/news/science_and_environment".to_string()],
            reddit_communities: vec![
                "https://www.reddit.com/r/science/".to_string(),
                "https://www.reddit.com/r/space/".to_string(),
            ],
            hours: 24,
            reddit_limit: 25,
            reddit_base_url: "https://www.reddit.com".to_string(),
            x_oembed_endpoint: "https://publish.twitter.com/oembed".to_string(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::Extractive,
            ollama_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
            prompt_template: "Summarize this news article:\n\n{text}".to_string(),
            timeout_secs: 120,
            max_sentences: 3,
            max_per_cycle: 20,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("NEWSAGG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 || self.http.link_timeout_secs == 0 {
            return Err(Error::config_validation(
                "http timeouts must be greater than 0",
            ));
        }

        interval_from_minutes(self.scheduler.interval_minutes)?;

        if self.sources.reddit_limit == 0 {
            return Err(Error::config_validation(
                "reddit_limit must be greater than 0",
            ));
        }

        for (name, value) in [
            ("reddit_base_url", &self.sources.reddit_base_url),
            ("x_oembed_endpoint", &self.sources.x_oembed_endpoint),
            ("ollama_url", &self.summarizer.ollama_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(Error::config_validation(format!(
                    "{name} is not a valid URL: {value}"
                )));
            }
        }

        if self.summarizer.backend == SummarizerBackend::Ollama
            && !self
                .summarizer
                .prompt_template
                .contains(PROMPT_TEXT_PLACEHOLDER)
        {
            return Err(Error::config_validation(format!(
                "prompt_template must contain {PROMPT_TEXT_PLACEHOLDER}"
            )));
        }

        if self.summarizer.backend == SummarizerBackend::Extractive
            && self.summarizer.max_sentences == 0
        {
            return Err(Error::config_validation(
                "max_sentences must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the default HTTP timeout as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Get the timeout for pages linked from Reddit posts.
    #[must_use]
    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.http.link_timeout_secs)
    }

    /// Get the scheduler interval as a Duration.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval_minutes` is out of range.
    pub fn scheduler_interval(&self) -> Result<Duration> {
        interval_from_minutes(self.scheduler.interval_minutes)
    }
}

impl SummarizerConfig {
    /// Get the summarizer request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Convert a scheduler interval in minutes, accepting 1 to
/// [`MAX_INTERVAL_MINUTES`].
///
/// # Errors
///
/// Returns [`Error::ConfigValidation`] for a zero or oversized interval.
pub fn interval_from_minutes(minutes: u64) -> Result<Duration> {
    if minutes == 0 {
        return Err(Error::config_validation(
            "interval_minutes must be greater than 0",
        ));
    }
    if minutes > MAX_INTERVAL_MINUTES {
        return Err(Error::config_validation(format!(
            "interval_minutes must be at most {MAX_INTERVAL_MINUTES}"
        )));
    }
    Ok(Duration::from_secs(minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_sources() {
        let sources = SourcesConfig::default();

        assert_eq!(sources.web_feeds.len(), 1);
        assert_eq!(sources.reddit_communities.len(), 2);
        assert_eq!(sources.hours, 24);
        assert_eq!(sources.reddit_limit, 25);
        assert!(sources.x_oembed_endpoint.contains("oembed"));
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert_eq!(storage.max_articles, 50_000);
        assert_eq!(storage.max_age_days, 90);
    }

    #[test]
    fn test_default_http_config() {
        let http = HttpConfig::default();

        assert!(http.user_agent.starts_with("newsagg/"));
        assert_eq!(http.timeout_secs, 10);
        assert_eq!(http.link_timeout_secs, 5);
    }

    #[test]
    fn test_default_summarizer_config() {
        let summarizer = SummarizerConfig::default();

        assert_eq!(summarizer.backend, SummarizerBackend::Extractive);
        assert!(summarizer.prompt_template.contains(PROMPT_TEXT_PLACEHOLDER));
        assert_eq!(summarizer.max_per_cycle, 20);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeouts"));
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.scheduler.interval_minutes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("interval_minutes"));
    }

    #[test]
    fn test_validate_zero_reddit_limit() {
        let mut config = Config::default();
        config.sources.reddit_limit = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reddit_limit"));
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = Config::default();
        config.summarizer.ollama_url = "localhost without scheme".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("ollama_url"));
    }

    #[test]
    fn test_validate_prompt_without_placeholder() {
        let mut config = Config::default();
        config.summarizer.backend = SummarizerBackend::Ollama;
        config.summarizer.prompt_template = "Summarize.".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("{text}"));
    }

    #[test]
    fn test_prompt_ignored_for_extractive_backend() {
        let mut config = Config::default();
        config.summarizer.prompt_template = "Summarize.".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("news.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.link_timeout(), Duration::from_secs(5));
        assert_eq!(config.summarizer.timeout(), Duration::from_secs(120));
        assert_eq!(config.scheduler_interval().unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_interval_from_minutes_bounds() {
        assert_eq!(interval_from_minutes(1).unwrap(), Duration::from_secs(60));
        assert_eq!(
            interval_from_minutes(MAX_INTERVAL_MINUTES).unwrap(),
            Duration::from_secs(MAX_INTERVAL_MINUTES * 60)
        );
        assert!(interval_from_minutes(0).is_err());
        assert!(interval_from_minutes(MAX_INTERVAL_MINUTES + 1).is_err());
        assert!(interval_from_minutes(u64::MAX).is_err());
    }

    #[test]
    fn test_validate_oversized_interval() {
        let mut config = Config::default();
        config.scheduler.interval_minutes = u64::MAX;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("at most"));
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(SummarizerBackend::Ollama.to_string(), "ollama");
        assert_eq!(SummarizerBackend::Extractive.to_string(), "extractive");
        assert_eq!(SummarizerBackend::None.to_string(), "none");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("newsagg"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[sources]
web_feeds = ["https://example.com/feed.xml"]
reddit_communities = []
hours = 6

[summarizer]
backend = "none"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.sources.web_feeds, vec!["https://example.com/feed.xml"]);
        assert!(config.sources.reddit_communities.is_empty());
        assert_eq!(config.sources.hours, 6);
        assert_eq!(config.summarizer.backend, SummarizerBackend::None);
        // Untouched sections keep their defaults
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_load_rejects_unknown_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[summarizer]\nbackend = \"gpt\"\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigLoad(_))));
    }

    #[test]
    fn test_summarizer_config_deserialize() {
        let json = r#"{"backend": "ollama", "model": "mistral"}"#;
        let summarizer: SummarizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(summarizer.backend, SummarizerBackend::Ollama);
        assert_eq!(summarizer.model, "mistral");
        assert_eq!(summarizer.timeout_secs, 120);
    }
}
