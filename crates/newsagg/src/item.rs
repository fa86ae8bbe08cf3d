//! The normalized news item produced by every ingestion source.
//!
//! RSS entries, Reddit posts, X statuses and scraped web pages all become a
//! [`NewsItem`] so that storage, summarization and the JSON output never
//! need to know where a story came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single story collected from some source.
///
/// The serialized field names and their nullability are the format of the
/// combined JSON output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Source-native identifier (feed guid, Reddit id, page URL).
    pub id: Option<String>,

    /// Headline.
    pub title: Option<String>,

    /// Canonical link to the story.
    pub link: Option<String>,

    /// When the story was published, if the source says so.
    pub published: Option<DateTime<Utc>>,

    /// Short plain-text description.
    pub summary: Option<String>,

    /// Plain-text body.
    pub content: Option<String>,

    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Categories, flairs and similar labels.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Where the item came from, e.g. a feed title, `reddit:science` or `x`.
    pub source: String,

    /// When the item was normalized.
    pub fetched_at: DateTime<Utc>,
}

impl NewsItem {
    /// Create an empty item attributed to `source`, fetched now.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            link: None,
            published: None,
            summary: None,
            content: None,
            authors: Vec::new(),
            tags: Vec::new(),
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }

    /// BLAKE3 key identifying this story within its source.
    ///
    /// Uses the link when present, then the id, title and content. Two
    /// fetches of the same story produce the same key even though
    /// `fetched_at` differs.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let identity = [&self.link, &self.id, &self.title, &self.content]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty())
            .map_or("", String::as_str);

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source.as_bytes());
        hasher.update(b"\0");
        hasher.update(identity.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// The best available text to summarize: content, then summary, then title.
    #[must_use]
    pub fn text_for_summary(&self) -> Option<&str> {
        [&self.content, &self.summary, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// Kind of source this item came from: `reddit`, `x`, `web` or `feed`.
    #[must_use]
    pub fn source_kind(&self) -> &'static str {
        if self.source.starts_with("reddit:") {
            "reddit"
        } else if self.source == "x" {
            "x"
        } else if self.source.starts_with("http://") || self.source.starts_with("https://") {
            "web"
        } else {
            "feed"
        }
    }

    /// Whether `published` (or `fetched_at` when undated) is at or after `cutoff`.
    #[must_use]
    pub fn is_newer_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.published.unwrap_or(self.fetched_at) >= cutoff
    }
}

/// 0001-01-01T00:00:00Z, the earliest time stored or compared against.
const EARLIEST_TIMESTAMP: i64 = -62_135_596_800;

/// The earliest time stored or compared against.
#[must_use]
pub fn earliest_time() -> DateTime<Utc> {
    DateTime::from_timestamp(EARLIEST_TIMESTAMP, 0).unwrap_or_default()
}

/// `now` minus `span`, or `None` when that lies before [`earliest_time`].
#[must_use]
pub fn checked_before(now: DateTime<Utc>, span: chrono::Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(span)
        .filter(|t| t.timestamp() >= EARLIEST_TIMESTAMP)
}

/// `now` minus `hours`, or `None` when that lies before [`earliest_time`].
#[must_use]
pub fn hours_before(now: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    checked_before(now, chrono::Duration::hours(i64::from(hours)))
}
