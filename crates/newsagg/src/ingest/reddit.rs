//! Reddit ingestion through the public JSON endpoints.
//!
//! Subreddits are read from `/r/{name}/new.json`; a single post is read by
//! appending `.json` to its permalink. Link posts without a body get the
//! linked page's text as content, best effort.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::ingest::extract::extract_text;
use crate::item::NewsItem;

/// Host used to build item links from permalinks.
const PERMALINK_HOST: &str = "https://reddit.com";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Child {
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    id: Option<String>,
    title: Option<String>,
    permalink: Option<String>,
    url: Option<String>,
    created_utc: Option<f64>,
    selftext: Option<String>,
    author: Option<String>,
    link_flair_text: Option<String>,
}

/// A post URL answers with `[post listing, comments listing]`; some
/// endpoints return the post listing alone.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostResponse {
    Pair(Vec<Listing>),
    Single(Listing),
}

impl PostResponse {
    fn into_first_post(self) -> Option<Post> {
        let listing = match self {
            Self::Pair(listings) => listings.into_iter().next()?,
            Self::Single(listing) => listing,
        };
        listing.data.children.into_iter().next().map(|c| c.data)
    }
}

/// Client for Reddit's JSON API.
#[derive(Debug, Clone)]
pub struct RedditClient {
    fetcher: HttpFetcher,
    base_url: String,
    link_timeout: Duration,
}

impl RedditClient {
    /// Create a client against `base_url` (normally `https://www.reddit.com`).
    #[must_use]
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>, link_timeout: Duration) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            link_timeout,
        }
    }

    /// URL of the newest-posts listing for `subreddit`.
    #[must_use]
    pub fn subreddit_url(&self, subreddit: &str, limit: u32) -> String {
        format!("{}/r/{subreddit}/new.json?limit={limit}", self.base_url)
    }

    /// JSON URL for a post permalink, rebased onto this client's base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `post_url` cannot be parsed.
    pub fn post_json_url(&self, post_url: &str) -> Result<String> {
        let parsed = Url::parse(post_url).map_err(|e| Error::InvalidUrl {
            url: post_url.to_string(),
            message: e.to_string(),
        })?;
        let path = parsed.path();
        let path = if path.ends_with(".json") {
            path.to_string()
        } else {
            format!("{}.json", path.strip_suffix('/').unwrap_or(path))
        };
        Ok(format!("{}{path}", self.base_url))
    }

    /// Fetch the newest posts of a subreddit.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or decoded.
    pub async fn fetch_subreddit(
        &self,
        subreddit: &str,
        limit: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<NewsItem>> {
        let url = self.subreddit_url(subreddit, limit);
        let listing: Listing = self.fetcher.fetch_json(&url, &[], timeout).await?;

        let source = format!("reddit:{subreddit}");
        let mut items = Vec::with_capacity(listing.data.children.len());
        for child in listing.data.children {
            items.push(self.normalize(child.data, &source).await);
        }
        debug!("r/{subreddit}: {} posts", items.len());
        Ok(items)
    }

    /// Fetch a single post by its URL.
    ///
    /// Returns an empty vector on any failure; the error is logged.
    pub async fn fetch_post(&self, post_url: &str, timeout: Option<Duration>) -> Vec<NewsItem> {
        match self.try_fetch_post(post_url, timeout).await {
            Ok(Some(item)) => vec![item],
            Ok(None) => {
                debug!("{post_url}: response contained no post");
                Vec::new()
            }
            Err(err) => {
                warn!("failed to fetch reddit post {post_url}: {err}");
                Vec::new()
            }
        }
    }

    async fn try_fetch_post(
        &self,
        post_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<NewsItem>> {
        let url = self.post_json_url(post_url)?;
        let response: PostResponse = self.fetcher.fetch_json(&url, &[], timeout).await?;
        match response.into_first_post() {
            Some(post) => Ok(Some(self.normalize(post, "reddit:post").await)),
            None => Ok(None),
        }
    }

    async fn normalize(&self, post: Post, source: &str) -> NewsItem {
        let mut item = NewsItem::new(source);
        let selftext = post.selftext.unwrap_or_default();

        item.id = post.id;
        item.title = Some(post.title.unwrap_or_default());
        item.link = match &post.permalink {
            Some(permalink) if !permalink.is_empty() => Some(format!("{PERMALINK_HOST}{permalink}")),
            _ => post.url.clone(),
        };
        item.published = post.created_utc.and_then(timestamp_to_datetime);
        item.summary = Some(selftext.clone());
        item.content = Some(selftext);
        item.authors = post.author.into_iter().filter(|a| !a.is_empty()).collect();
        item.tags = post
            .link_flair_text
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect();

        if item.content.as_deref().is_some_and(str::is_empty) {
            if let Some(linked) = post.url.as_deref().filter(|u| is_external_link(u)) {
                if let Some(text) = self.linked_page_text(linked).await {
                    item.content = Some(text);
                }
            }
        }

        item
    }

    async fn linked_page_text(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch_text(url, Some(self.link_timeout)).await {
            Ok(html) => extract_text(&html).filter(|t| !t.is_empty()),
            Err(err) => {
                debug!("linked page {url} not fetched: {err}");
                None
            }
        }
    }
}

/// A post URL pointing away from Reddit (self posts link to themselves).
fn is_external_link(url: &str) -> bool {
    Url::parse(url).ok().is_some_and(|parsed| {
        parsed.host_str().is_some_and(|host| {
            let host = host.trim_start_matches("www.");
            host != "reddit.com" && !host.ends_with(".reddit.com") && host != "redd.it"
        })
    })
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds as i64, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> RedditClient {
        let fetcher = HttpFetcher::new("newsagg-test", Duration::from_secs(5)).unwrap();
        RedditClient::new(fetcher, base, Duration::from_secs(2))
    }

    fn post_json(id: &str, selftext: &str, url: &str) -> serde_json::Value {
        json!({
            "kind": "t3",
            "data": {
                "id": id,
                "title": format!("Post {id}"),
                "permalink": format!("/r/science/comments/{id}/post/"),
                "url": url,
                "created_utc": 1_771_322_400.0,
                "selftext": selftext,
                "author": "alice",
                "link_flair_text": "Biology"
            }
        })
    }

    #[test]
    fn test_post_json_url() {
        let c = client("https://www.reddit.com/");
        assert_eq!(
            c.post_json_url("https://www.reddit.com/r/a/comments/xyz/title/").unwrap(),
            "https://www.reddit.com/r/a/comments/xyz/title.json"
        );
        assert_eq!(
            c.post_json_url("https://old.reddit.com/r/a/comments/xyz.json").unwrap(),
            "https://www.reddit.com/r/a/comments/xyz.json"
        );
        assert!(c.post_json_url("not a url").is_err());
    }

    #[test]
    fn test_is_external_link() {
        assert!(is_external_link("https://nature.com/articles/1"));
        assert!(!is_external_link("https://www.reddit.com/r/a/comments/1/"));
        assert!(!is_external_link("https://i.reddit.com/x"));
        assert!(!is_external_link("https://redd.it/abc"));
        assert!(!is_external_link("garbage"));
    }

    #[tokio::test]
    async fn test_fetch_subreddit_normalizes_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/science/new.json"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "children": [
                    post_json("a1", "self text", "https://www.reddit.com/r/science/comments/a1/post/"),
                    post_json("b2", "", "https://www.reddit.com/r/science/comments/b2/post/"),
                ]}
            })))
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_subreddit("science", 2, None)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        let first = &items[0];
        assert_eq!(first.id.as_deref(), Some("a1"));
        assert_eq!(first.title.as_deref(), Some("Post a1"));
        assert_eq!(
            first.link.as_deref(),
            Some("https://reddit.com/r/science/comments/a1/post/")
        );
        assert_eq!(first.content.as_deref(), Some("self text"));
        assert_eq!(first.summary.as_deref(), Some("self text"));
        assert_eq!(first.authors, vec!["alice"]);
        assert_eq!(first.tags, vec!["Biology"]);
        assert_eq!(first.source, "reddit:science");
        assert_eq!(
            first.published,
            DateTime::from_timestamp(1_771_322_400, 0)
        );
        // Self post without body stays empty
        assert_eq!(items[1].content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_link_post_fetches_linked_page() {
        let server = MockServer::start().await;
        let linked = format!("{}/article", server.uri());
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><article><p>Linked body</p></article></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/space/new.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "children": [ post_json("c3", "", &linked) ] }
            })))
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_subreddit("space", 25, None)
            .await
            .unwrap();

        assert_eq!(items[0].content.as_deref(), Some("Linked body"));
        assert_eq!(items[0].summary.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_link_post_failure_is_ignored() {
        let server = MockServer::start().await;
        let linked = format!("{}/missing", server.uri());
        Mock::given(method("GET"))
            .and(path("/r/space/new.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "children": [ post_json("d4", "", &linked) ] }
            })))
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_subreddit("space", 25, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_fetch_subreddit_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .fetch_subreddit("science", 25, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_fetch_post_from_pair_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/science/comments/e5/post.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "kind": "Listing", "data": { "children": [
                    post_json("e5", "body", "https://www.reddit.com/r/science/comments/e5/post/")
                ]}},
                { "kind": "Listing", "data": { "children": [
                    { "kind": "t1", "data": { "id": "c1", "body": "a comment" } }
                ]}}
            ])))
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_post("https://www.reddit.com/r/science/comments/e5/post/", None)
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("e5"));
        assert_eq!(items[0].source, "reddit:post");
    }

    #[tokio::test]
    async fn test_fetch_post_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_post("https://www.reddit.com/r/science/comments/zz/post/", None)
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_post_empty_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"children": []}})),
            )
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .fetch_post("https://www.reddit.com/r/science/comments/zz/post/", None)
            .await;
        assert!(items.is_empty());
    }
}
