//! Extractive summarizer.
//!
//! Keeps the lead sentences of an article. Needs no model or network.

use std::sync::OnceLock;

use regex::Regex;

use super::Summarizer;
use crate::error::{Error, Result};

const NAME: &str = "extractive";

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[.!?][\u{201D}\u{2019}\x22')\]]*\s+").expect("Invalid regex pattern")
    })
}

/// Summarizes by keeping the leading sentences of the text.
///
/// News copy front-loads the important facts, so the lead is a usable
/// summary when no model is available.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl ExtractiveSummarizer {
    /// Keep at most `max_sentences` sentences (at least one).
    #[must_use]
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    fn lead(&self, text: &str) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut end = normalized.len();
        for (count, m) in sentence_end().find_iter(&normalized).enumerate() {
            if count + 1 == self.max_sentences {
                end = m.end();
                break;
            }
        }
        normalized[..end].trim_end().to_string()
    }
}

#[async_trait::async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let summary = self.lead(text);
        if summary.is_empty() {
            return Err(Error::summarizer(NAME, "no text to summarize"));
        }
        Ok(summary)
    }
}
