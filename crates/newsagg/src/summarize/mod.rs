//! Pluggable summarization.
//!
//! A [`Summarizer`] turns article text into a short summary. The backend is
//! chosen by `[summarizer] backend` in the configuration:
//!
//! - `ollama`: a local Ollama server ([`OllamaSummarizer`]).
//! - `extractive`: lead sentences, no model needed ([`ExtractiveSummarizer`]).
//! - `none`: summarization is skipped.

mod extractive;
mod ollama;

pub use extractive::ExtractiveSummarizer;
pub use ollama::OllamaSummarizer;

use crate::config::{SummarizerBackend, SummarizerConfig};
use crate::error::Result;

/// A text summarization backend.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Short backend name, stored alongside each summary.
    fn name(&self) -> &'static str;

    /// Return a summary of `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces an empty summary.
    async fn summarize(&self, text: &str) -> Result<String>;
}

impl std::fmt::Debug for dyn Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("name", &self.name())
            .finish()
    }
}

/// Build the configured summarizer, or `None` when summarization is off.
///
/// # Errors
///
/// Returns an error if the backend's HTTP client cannot be constructed.
pub fn from_config(config: &SummarizerConfig) -> Result<Option<Box<dyn Summarizer>>> {
    let summarizer: Box<dyn Summarizer> = match config.backend {
        SummarizerBackend::None => return Ok(None),
        SummarizerBackend::Extractive => {
            Box::new(ExtractiveSummarizer::new(config.max_sentences))
        }
        SummarizerBackend::Ollama => Box::new(OllamaSummarizer::new(
            &config.ollama_url,
            &config.model,
            &config.prompt_template,
            config.timeout(),
        )?),
    };
    Ok(Some(summarizer))
}
