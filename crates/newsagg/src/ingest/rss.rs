//! RSS and Atom ingestion.
//!
//! Feeds are parsed with `feed-rs`, which handles RSS 0.9x/1.0/2.0, Atom
//! and JSON Feed. A URL that serves an HTML page is resolved through the
//! page's `<link rel="alternate">` feed declarations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::ingest::extract::html_to_text;
use crate::item::{hours_before, NewsItem};

/// Media types advertised by `<link rel="alternate">` for feeds.
const FEED_MEDIA_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
];

/// Parse a feed document.
///
/// # Errors
///
/// Returns [`Error::FeedParse`] if `body` is not a recognizable feed.
pub fn parse_feed(body: &[u8], url: &str) -> Result<Feed> {
    feed_rs::parser::parse(body).map_err(|e| Error::FeedParse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Normalize feed entries into [`NewsItem`]s.
///
/// `feed_title` becomes the item source; `feed_url` is used when the feed
/// has no title.
#[must_use]
pub fn parse_entries(entries: &[Entry], feed_title: Option<&str>, feed_url: &str) -> Vec<NewsItem> {
    let source = feed_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(feed_url);

    entries
        .iter()
        .map(|entry| entry_to_item(entry, source))
        .collect()
}

fn entry_to_item(entry: &Entry, source: &str) -> NewsItem {
    let mut item = NewsItem::new(source);

    item.id = Some(entry.id.clone()).filter(|id| !id.is_empty());
    item.title = entry
        .title
        .as_ref()
        .map(|t| html_to_text(&t.content))
        .filter(|t| !t.is_empty());
    item.link = entry
        .links
        .iter()
        .find(|link| link.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|link| link.href.clone());
    item.published = entry.published.or(entry.updated);
    item.summary = entry
        .summary
        .as_ref()
        .map(|s| html_to_text(&s.content))
        .filter(|s| !s.is_empty());
    item.content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .map(html_to_text)
        .filter(|c| !c.is_empty())
        .or_else(|| item.summary.clone());
    item.authors = entry
        .authors
        .iter()
        .map(|person| person.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    item.tags = entry
        .categories
        .iter()
        .map(|category| category.term.clone())
        .collect();

    item
}

/// Keep items published within the last `hours` hours of `now`.
///
/// Undated items are kept: nothing shows them to be old. A window reaching
/// past the earliest representable time keeps everything.
#[must_use]
pub fn filter_recent(items: Vec<NewsItem>, hours: u32, now: DateTime<Utc>) -> Vec<NewsItem> {
    let Some(cutoff) = hours_before(now, hours) else {
        return items;
    };
    items
        .into_iter()
        .filter(|item| item.published.is_none() || item.is_newer_than(cutoff))
        .collect()
}

/// Find feed URLs advertised by an HTML page, resolved against `base_url`.
#[must_use]
pub fn discover_feed_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(r#"link[rel~="alternate"][href]"#) else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter(|link| {
            link.value()
                .attr("type")
                .is_some_and(|t| FEED_MEDIA_TYPES.contains(&t.trim().to_ascii_lowercase().as_str()))
        })
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Url::parse(href).ok().map(String::from),
        })
        .collect()
}

/// Fetch `url` and return the entries from the last `hours` hours.
///
/// If the body is not a feed it is treated as HTML and each advertised
/// feed is tried in order.
///
/// # Errors
///
/// Returns a network error if `url` cannot be fetched, or
/// [`Error::FeedNotFound`] if no feed could be resolved.
pub async fn fetch_recent(
    fetcher: &HttpFetcher,
    url: &str,
    hours: u32,
    timeout: Option<Duration>,
) -> Result<Vec<NewsItem>> {
    let body = fetcher.fetch_bytes(url, timeout).await?;

    let feed = match parse_feed(&body, url) {
        Ok(feed) => Some((feed, url.to_string())),
        Err(err) => {
            debug!("{url} is not a feed ({err}), looking for advertised feeds");
            let candidates = discover_feed_links(&String::from_utf8_lossy(&body), url);
            resolve_first(fetcher, &candidates, timeout).await
        }
    };

    let Some((feed, feed_url)) = feed else {
        return Err(Error::FeedNotFound {
            url: url.to_string(),
        });
    };

    let title = feed.title.as_ref().map(|t| html_to_text(&t.content));
    let items = parse_entries(&feed.entries, title.as_deref(), &feed_url);
    let total = items.len();
    let recent = filter_recent(items, hours, Utc::now());
    info!(
        "{feed_url}: {} of {total} entries within {hours}h",
        recent.len()
    );
    Ok(recent)
}

async fn resolve_first(
    fetcher: &HttpFetcher,
    candidates: &[String],
    timeout: Option<Duration>,
) -> Option<(Feed, String)> {
    for candidate in candidates {
        match fetcher.fetch_bytes(candidate, timeout).await {
            Ok(body) => match parse_feed(&body, candidate) {
                Ok(feed) => return Some((feed, candidate.clone())),
                Err(err) => debug!("advertised feed rejected: {err}"),
            },
            Err(err) => debug!("advertised feed unreachable: {err}"),
        }
    }
    None
}
