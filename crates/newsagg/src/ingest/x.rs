//! X/Twitter statuses via the public oEmbed endpoint (no API key).

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::http::HttpFetcher;
use crate::ingest::extract::html_to_text;
use crate::item::NewsItem;

/// Characters of status text used as the item title.
const TITLE_CHARS: usize = 120;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OEmbed {
    html: String,
    author_name: Option<String>,
    author_url: Option<String>,
}

/// Client for the oEmbed endpoint.
#[derive(Debug, Clone)]
pub struct XClient {
    fetcher: HttpFetcher,
    endpoint: String,
}

impl XClient {
    /// Create a client for `endpoint` (normally `https://publish.twitter.com/oembed`).
    #[must_use]
    pub fn new(fetcher: HttpFetcher, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch and normalize one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the oEmbed request fails or its body is not JSON.
    pub async fn fetch_oembed(
        &self,
        status_url: &str,
        timeout: Option<Duration>,
    ) -> Result<NewsItem> {
        let oembed: OEmbed = self
            .fetcher
            .fetch_json(&self.endpoint, &[("url", status_url)], timeout)
            .await?;

        let text = html_to_text(&oembed.html);
        let mut item = NewsItem::new("x");
        item.title = Some(text.chars().take(TITLE_CHARS).collect());
        item.link = Some(status_url.to_string());
        item.summary = Some(text.clone());
        item.content = Some(text);
        item.authors = oembed
            .author_name
            .filter(|name| !name.is_empty())
            .or(oembed.author_url.filter(|url| !url.is_empty()))
            .into_iter()
            .collect();
        Ok(item)
    }

    /// Like [`XClient::fetch_oembed`], but failures become `None`.
    pub async fn fetch_status(&self, status_url: &str, timeout: Option<Duration>) -> Option<NewsItem> {
        match self.fetch_oembed(status_url, timeout).await {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("failed x/twitter {status_url}: {err}");
                None
            }
        }
    }
}
