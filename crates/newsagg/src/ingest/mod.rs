//! Ingestion sources.
//!
//! - [`rss`]: RSS/Atom feeds, including feeds advertised by HTML pages.
//! - [`reddit`]: subreddit listings and single posts via Reddit's JSON API.
//! - [`x`]: X/Twitter statuses via oEmbed.
//! - [`extract`]: main-text extraction for plain web pages.
//! - [`dispatch`]: routes mixed URL lists to the right source.
//!
//! Every source produces [`crate::NewsItem`]s.

pub mod dispatch;
pub mod extract;
pub mod reddit;
pub mod rss;
pub mod x;

pub use dispatch::{classify, urls_from_text, write_items_json, Collector, UrlKind};
pub use extract::{extract_text, html_to_text};
pub use reddit::RedditClient;
pub use x::XClient;
