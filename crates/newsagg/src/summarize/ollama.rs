//! Summarization through a local Ollama server.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Summarizer;
use crate::config::PROMPT_TEXT_PLACEHOLDER;
use crate::error::{Error, Result};

const NAME: &str = "ollama";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    error: Option<String>,
}

/// Summarizer backed by a local Ollama server's `/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    prompt_template: String,
    timeout: Duration,
}

impl OllamaSummarizer {
    /// Create a summarizer for the server at `base_url`.
    ///
    /// `prompt_template` must contain `{text}`, which is replaced by the
    /// article text.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        model: &str,
        prompt_template: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|source| Error::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompt_template: prompt_template.to_string(),
            timeout,
        })
    }

    /// The prompt sent for `text`.
    #[must_use]
    pub fn build_prompt(&self, text: &str) -> String {
        self.prompt_template.replace(PROMPT_TEXT_PLACEHOLDER, text)
    }

    /// Whether the server answers at all.
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl Summarizer for OllamaSummarizer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": self.build_prompt(text),
            "stream": false,
        });

        debug!("POST {url} model={}", self.model);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::summarizer(NAME, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<GenerateResponse>()
                .await
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_default();
            return Err(Error::summarizer(
                NAME,
                format!("HTTP error: {status} {detail}").trim_end(),
            ));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::summarizer(NAME, format!("failed to parse response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(Error::summarizer(NAME, error));
        }

        let summary = parsed.response.trim();
        if summary.is_empty() {
            return Err(Error::summarizer(NAME, "empty response"));
        }
        Ok(summary.to_string())
    }
}
