//! Shared HTTP fetcher.
//!
//! One `reqwest::Client` carries the configured `User-Agent`; each request
//! takes its own timeout so callers can shorten it for best-effort lookups.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{Error, Result};

/// HTTP client used by every ingestion source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with the given `User-Agent` and default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed
    /// (for example when the TLS backend fails to initialize).
    pub fn new(user_agent: &str, default_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|source| Error::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Build a fetcher from the `[http]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.http.user_agent, config.http_timeout())
    }

    /// GET `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure and [`Error::HttpStatus`]
    /// when the server answers with a non-success status.
    pub async fn fetch_text(&self, url: &str, timeout: Option<Duration>) -> Result<String> {
        let response = self.send(url, &[], timeout).await?;
        response.text().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }

    /// GET `url` and return the raw body bytes.
    ///
    /// # Errors
    ///
    /// Same as [`HttpFetcher::fetch_text`].
    pub async fn fetch_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let response = self.send(url, &[], timeout).await?;
        let bytes = response.bytes().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    /// GET `url` with query parameters and deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpFetcher::fetch_text`], plus [`Error::Http`] when the
    /// body is not valid JSON for `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<T> {
        let response = self.send(url, query, timeout).await?;
        response.json::<T>().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        debug!(url, ?timeout, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        trace!(url, %status, "response");
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("newsagg-test/1.0", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_text_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "newsagg-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_text(&format!("{}/page", server.uri()), None)
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_fetch_text_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_text(&format!("{}/down", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_json_with_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("url", "https://x.com/a/status/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            )
            .mount(&server)
            .await;

        let value: serde_json::Value = fetcher()
            .fetch_json(
                &format!("{}/api", server.uri()),
                &[("url", "https://x.com/a/status/1")],
                None,
            )
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_timeout_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_text(&server.uri(), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { .. }));
    }
}
