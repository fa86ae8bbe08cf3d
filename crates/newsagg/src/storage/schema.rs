//! `SQLite` schema definitions for newsagg.

/// SQL statement to create the sources table.
pub const CREATE_SOURCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT,
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the articles table.
///
/// `authors` and `tags` hold JSON arrays.
pub const CREATE_ARTICLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    item_id TEXT,
    title TEXT,
    link TEXT,
    published TEXT,
    summary TEXT,
    content TEXT,
    authors TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    dedup_key TEXT NOT NULL UNIQUE,
    fetched_at TEXT NOT NULL
)
";

/// SQL statement to create the summaries table, one row per article.
pub const CREATE_SUMMARIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL UNIQUE REFERENCES articles(id) ON DELETE CASCADE,
    summarizer TEXT NOT NULL,
    summary TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// Index for recency queries.
pub const CREATE_FETCHED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_articles_fetched ON articles(fetched_at DESC)
";

/// Index for per-source queries.
pub const CREATE_SOURCE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Version 2: count failed summarization attempts per article.
pub const ADD_SUMMARY_ATTEMPTS: &str = r"
ALTER TABLE articles ADD COLUMN summary_attempts INTEGER NOT NULL DEFAULT 0
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SOURCES_TABLE,
    CREATE_ARTICLES_TABLE,
    CREATE_SUMMARIES_TABLE,
    CREATE_FETCHED_INDEX,
    CREATE_SOURCE_INDEX,
    CREATE_METADATA_TABLE,
];
