//! URL classification and multi-source collection.
//!
//! A mixed list of subreddit pages, Reddit posts, X statuses and ordinary
//! feeds or pages is routed to the matching client. One failing URL never
//! aborts the batch.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::ingest::extract::extract_text;
use crate::ingest::reddit::RedditClient;
use crate::ingest::rss;
use crate::ingest::x::XClient;
use crate::item::NewsItem;

/// What kind of source a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// A single Reddit post (path contains `/comments/`).
    RedditPost,
    /// A subreddit listing.
    Subreddit(String),
    /// A Reddit URL that is neither a post nor a subreddit.
    Reddit,
    /// An X/Twitter status.
    XStatus,
    /// Anything else: an RSS/Atom feed or a web page.
    Web,
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RedditPost => write!(f, "reddit post"),
            Self::Subreddit(name) => write!(f, "r/{name}"),
            Self::Reddit => write!(f, "reddit"),
            Self::XStatus => write!(f, "x status"),
            Self::Web => write!(f, "web"),
        }
    }
}

fn subreddit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|/)r/([A-Za-z0-9_]+)/?").expect("Invalid regex pattern"))
}

/// Classify a URL by its host and path.
#[must_use]
pub fn classify(url: &str) -> UrlKind {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("r/") || lower.starts_with("/r/") {
        return subreddit_name(trimmed).map_or(UrlKind::Reddit, UrlKind::Subreddit);
    }

    let Ok(parsed) = Url::parse(trimmed) else {
        return UrlKind::Web;
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if host_matches(&host, "reddit.com") || host_matches(&host, "redd.it") {
        if parsed.path().contains("/comments/") {
            return UrlKind::RedditPost;
        }
        return subreddit_name(parsed.path()).map_or(UrlKind::Reddit, UrlKind::Subreddit);
    }

    if host_matches(&host, "twitter.com") || host_matches(&host, "x.com") {
        return UrlKind::XStatus;
    }

    UrlKind::Web
}

/// `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn subreddit_name(path: &str) -> Option<String> {
    subreddit_regex()
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split pasted text into URLs: one per non-empty line.
#[must_use]
pub fn urls_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Write items as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub fn write_items_json(items: &[NewsItem], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(path, json).map_err(|source| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Collects items from mixed URL lists.
#[derive(Debug, Clone)]
pub struct Collector {
    fetcher: HttpFetcher,
    reddit: RedditClient,
    x: XClient,
    reddit_limit: u32,
    web_feeds: Vec<String>,
    reddit_communities: Vec<String>,
}

impl Collector {
    /// Build a collector from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(config)?;
        Ok(Self::new(fetcher, config))
    }

    /// Build a collector around an existing fetcher.
    #[must_use]
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Self {
        let sources = &config.sources;
        Self {
            reddit: RedditClient::new(
                fetcher.clone(),
                sources.reddit_base_url.clone(),
                config.link_timeout(),
            ),
            x: XClient::new(fetcher.clone(), sources.x_oembed_endpoint.clone()),
            fetcher,
            reddit_limit: sources.reddit_limit,
            web_feeds: sources.web_feeds.clone(),
            reddit_communities: sources.reddit_communities.clone(),
        }
    }

    /// Collect items from every URL, in input order.
    pub async fn collect_from_urls<S: AsRef<str>>(
        &self,
        urls: &[S],
        hours: u32,
        timeout: Option<Duration>,
    ) -> Vec<NewsItem> {
        let total = urls.len();
        info!("Processing {total} source(s)...");

        let mut combined = Vec::new();
        for (idx, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            info!("[{}/{total}] {url}", idx + 1);
            match self.collect_one(url, hours, timeout).await {
                Ok(items) => {
                    info!("  fetched {} items", items.len());
                    combined.extend(items);
                }
                Err(err) => warn!("  skipped {url}: {err}"),
            }
        }
        combined
    }

    /// Collect items from a single URL according to its [`UrlKind`].
    ///
    /// # Errors
    ///
    /// Returns an error only when every strategy for the URL failed.
    pub async fn collect_one(
        &self,
        url: &str,
        hours: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<NewsItem>> {
        match classify(url) {
            UrlKind::RedditPost => Ok(self.reddit.fetch_post(url, timeout).await),
            UrlKind::Subreddit(name) => {
                self.reddit
                    .fetch_subreddit(&name, self.reddit_limit, timeout)
                    .await
            }
            UrlKind::Reddit => {
                warn!("  unrecognized reddit URL {url}");
                Ok(Vec::new())
            }
            UrlKind::XStatus => Ok(self.x.fetch_status(url, timeout).await.into_iter().collect()),
            UrlKind::Web => self.collect_web(url, hours, timeout).await,
        }
    }

    async fn collect_web(
        &self,
        url: &str,
        hours: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<NewsItem>> {
        match rss::fetch_recent(&self.fetcher, url, hours, timeout).await {
            Ok(items) => Ok(items),
            Err(feed_err) => {
                info!("  no feed at {url} ({feed_err}), extracting page text");
                let html = self.fetcher.fetch_text(url, timeout).await?;
                Ok(page_item(url, &html).into_iter().collect())
            }
        }
    }

    /// The configured web feeds followed by the configured Reddit communities.
    pub fn configured_urls(&self) -> impl Iterator<Item = &str> {
        self.web_feeds
            .iter()
            .chain(&self.reddit_communities)
            .map(String::as_str)
    }

    /// Collect the configured web feeds, then the configured Reddit communities.
    pub async fn collect_configured(&self, hours: u32, timeout: Option<Duration>) -> Vec<NewsItem> {
        let mut combined = Vec::new();

        if !self.web_feeds.is_empty() {
            let items = self.collect_from_urls(&self.web_feeds, hours, timeout).await;
            info!("Collected {} items from web feeds", items.len());
            combined.extend(items);
        }

        if !self.reddit_communities.is_empty() {
            let items = self
                .collect_from_urls(&self.reddit_communities, hours, timeout)
                .await;
            info!("Collected {} items from reddit communities", items.len());
            combined.extend(items);
        }

        combined
    }

    /// Collect the configured sources and write them to `out`.
    ///
    /// Returns the number of items written.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be written.
    pub async fn run_default(
        &self,
        out: &Path,
        hours: u32,
        timeout: Option<Duration>,
    ) -> Result<usize> {
        let combined = self.collect_configured(hours, timeout).await;
        write_items_json(&combined, out)?;
        info!("Wrote {} total entries to {}", combined.len(), out.display());
        Ok(combined.len())
    }

    /// Collect arbitrary URLs and write them to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be written.
    pub async fn process_url_list<S: AsRef<str>>(
        &self,
        urls: &[S],
        out: &Path,
        hours: u32,
        timeout: Option<Duration>,
    ) -> Result<usize> {
        let items = self.collect_from_urls(urls, hours, timeout).await;
        write_items_json(&items, out)?;
        info!("Wrote {} total entries to {}", items.len(), out.display());
        Ok(items.len())
    }
}

/// One item holding the extracted text of a plain web page.
fn page_item(url: &str, html: &str) -> Option<NewsItem> {
    let text = extract_text(html)?;
    let now = Utc::now();
    let mut item = NewsItem::new(url);
    item.id = Some(url.to_string());
    item.link = Some(url.to_string());
    item.published = Some(now);
    item.fetched_at = now;
    item.content = Some(text);
    Some(item)
}
