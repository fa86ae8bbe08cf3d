//! One ingestion and summarization cycle.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::Collector;
use crate::item::NewsItem;
use crate::storage::Storage;
use crate::summarize::{self, Summarizer};

/// What a single cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Items returned by the sources.
    pub collected: usize,
    /// Items stored as new articles.
    pub inserted: usize,
    /// Items skipped because they were already stored.
    pub duplicates: usize,
    /// Articles summarized.
    pub summarized: usize,
    /// Articles whose summarization failed; they are retried after articles
    /// that have failed less often.
    pub summary_failures: usize,
    /// Articles removed by retention.
    pub pruned: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collected {}, inserted {}, duplicates {}, summarized {}, summary failures {}, pruned {}",
            self.collected,
            self.inserted,
            self.duplicates,
            self.summarized,
            self.summary_failures,
            self.pruned
        )
    }
}

/// Runs collection, storage, summarization and retention.
pub struct IngestionOrchestrator {
    collector: Collector,
    storage: Storage,
    summarizer: Option<Box<dyn Summarizer>>,
    hours: u32,
    timeout: Duration,
    max_per_cycle: usize,
    max_age_days: u32,
    max_articles: usize,
}

impl fmt::Debug for IngestionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOrchestrator")
            .field("collector", &self.collector)
            .field("storage", &self.storage)
            .field("summarizer", &self.summarizer.as_ref().map(|s| s.name()))
            .field("hours", &self.hours)
            .field("max_per_cycle", &self.max_per_cycle)
            .finish_non_exhaustive()
    }
}

impl IngestionOrchestrator {
    /// Assemble an orchestrator from its parts.
    #[must_use]
    pub fn new(
        config: &Config,
        collector: Collector,
        storage: Storage,
        summarizer: Option<Box<dyn Summarizer>>,
    ) -> Self {
        Self {
            collector,
            storage,
            summarizer,
            hours: config.sources.hours,
            timeout: config.http_timeout(),
            max_per_cycle: config.summarizer.max_per_cycle,
            max_age_days: config.storage.max_age_days,
            max_articles: config.storage.max_articles,
        }
    }

    /// Build the collector, open the database and pick the summarizer
    /// described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or an HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let collector = Collector::from_config(config)?;
        let storage = Storage::open(config.database_path())?;
        let summarizer = summarize::from_config(&config.summarizer)?;
        Ok(Self::new(config, collector, storage, summarizer))
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run one full cycle.
    ///
    /// A source that fails to fetch, or an article that fails to summarize,
    /// is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.ingest(&mut report).await?;
        if let Some(summarizer) = &self.summarizer {
            self.summarize_pending(summarizer.as_ref(), &mut report)
                .await?;
        }
        report.pruned = self
            .storage
            .apply_retention(self.max_age_days, self.max_articles)?;

        info!("Cycle finished: {report}");
        Ok(report)
    }

    async fn ingest(&self, report: &mut CycleReport) -> Result<()> {
        let urls: Vec<&str> = self.collector.configured_urls().collect();
        let total = urls.len();

        for (idx, url) in urls.into_iter().enumerate() {
            info!("[{}/{total}] {url}", idx + 1);
            let items = match self
                .collector
                .collect_one(url, self.hours, Some(self.timeout))
                .await
            {
                Ok(items) => items,
                Err(err) => {
                    warn!("  skipped {url}: {err}");
                    continue;
                }
            };
            info!("  fetched {} items", items.len());
            report.collected += items.len();
            self.store(url, &items, report)?;
        }
        Ok(())
    }

    fn store(&self, url: &str, items: &[NewsItem], report: &mut CycleReport) -> Result<()> {
        let mut seen_sources = HashSet::new();
        for item in items {
            if seen_sources.insert(item.source.as_str()) {
                self.storage
                    .upsert_source(&item.source, Some(url), item.source_kind())?;
            }
            match self.storage.insert_item(item)? {
                Some(_) => report.inserted += 1,
                None => report.duplicates += 1,
            }
        }
        Ok(())
    }

    async fn summarize_pending(
        &self,
        summarizer: &dyn Summarizer,
        report: &mut CycleReport,
    ) -> Result<()> {
        if self.max_per_cycle == 0 {
            return Ok(());
        }

        let pending = self.storage.unsummarized(self.max_per_cycle)?;
        debug!("{} article(s) awaiting a summary", pending.len());

        for article in pending {
            let Some(text) = article.item.text_for_summary() else {
                // Nothing to summarize; store an empty summary so it is not retried.
                self.storage
                    .insert_summary(article.id, summarizer.name(), "")?;
                continue;
            };

            match summarizer.summarize(text).await {
                Ok(summary) => {
                    self.storage
                        .insert_summary(article.id, summarizer.name(), &summary)?;
                    report.summarized += 1;
                }
                Err(err) => {
                    warn!("Failed to summarize article {}: {err}", article.id);
                    self.storage.record_summary_failure(article.id)?;
                    report.summary_failures += 1;
                }
            }
        }
        Ok(())
    }
}
