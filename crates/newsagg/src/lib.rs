//! `newsagg` - collect, store and summarize news from feeds, Reddit and X
//!
//! The library turns RSS/Atom feeds, subreddits, Reddit posts, X statuses
//! and plain web pages into [`NewsItem`]s, stores them in `SQLite`, and
//! summarizes them with a pluggable [`Summarizer`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod http;
pub mod ingest;
pub mod item;
pub mod logging;
pub mod orchestrator;
pub mod scheduler;
pub mod storage;
pub mod summarize;

pub use config::Config;
pub use digest::{compose_digest, DigestEntry};
pub use error::{Error, Result};
pub use http::HttpFetcher;
pub use ingest::{Collector, UrlKind};
pub use item::NewsItem;
pub use logging::init_logging;
pub use orchestrator::{CycleReport, IngestionOrchestrator};
pub use scheduler::{run_scheduled, SchedulerHandle};
pub use storage::{Article, Storage, StorageStats};
pub use summarize::Summarizer;
