//! HTML digest of recent articles.

use askama::Template;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::item::{earliest_time, hours_before, NewsItem};
use crate::storage::Storage;

const UNTITLED: &str = "(untitled)";

/// One article in a digest, with its stored summary if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    /// The article.
    pub item: NewsItem,
    /// Summary produced by a summarizer.
    pub summary: Option<String>,
}

impl DigestEntry {
    /// The stored summary, else the item's own summary.
    #[must_use]
    pub fn display_summary(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.item.summary.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Start of a digest covering the last `hours` hours, clamped to
/// [`earliest_time`].
#[must_use]
pub fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    hours_before(now, hours).unwrap_or_else(earliest_time)
}

/// Load digest entries for articles newer than `cutoff`, newest first.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub fn load_entries(
    storage: &Storage,
    cutoff: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<DigestEntry>> {
    storage
        .since(cutoff, limit)?
        .into_iter()
        .map(|article| {
            let summary = storage.summary_for(article.id)?.map(|s| s.summary);
            Ok(DigestEntry {
                item: article.item,
                summary,
            })
        })
        .collect()
}

#[derive(Debug)]
struct EntryView<'a> {
    title: &'a str,
    link: Option<&'a str>,
    source: &'a str,
    date: Option<String>,
    summary: Option<&'a str>,
}

#[derive(Debug, Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    title: &'a str,
    entries: Vec<EntryView<'a>>,
}

/// Render `entries` as a standalone HTML document.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn compose_digest(entries: &[DigestEntry], title: &str) -> Result<String> {
    let entries = entries
        .iter()
        .map(|entry| {
            let item = &entry.item;
            EntryView {
                title: item
                    .title
                    .as_deref()
                    .or(item.link.as_deref())
                    .unwrap_or(UNTITLED),
                link: item.link.as_deref(),
                source: &item.source,
                date: item
                    .published
                    .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string()),
                summary: entry.display_summary(),
            }
        })
        .collect();

    Ok(DigestTemplate { title, entries }.render()?)
}
