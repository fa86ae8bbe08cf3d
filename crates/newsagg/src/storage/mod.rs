//! Storage layer for newsagg.
//!
//! `SQLite` persistence for sources, articles and their summaries, with
//! deduplication on [`NewsItem::dedup_key`], search and pruning.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::item::{checked_before, NewsItem};

const MEMORY_PATH: &str = ":memory:";

/// Columns selected for every article query, in [`Storage::row_to_article`] order.
const ARTICLE_COLUMNS: &str = "a.id, s.name, a.item_id, a.title, a.link, a.published, \
     a.summary, a.content, a.authors, a.tags, a.dedup_key, a.fetched_at";

/// A stored article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Database id.
    pub id: i64,
    /// Deduplication key the article was stored under.
    pub dedup_key: String,
    /// The article itself; `item.source` is the source name.
    pub item: NewsItem,
}

/// A stored summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The summarized article.
    pub article_id: i64,
    /// Name of the summarizer that produced it.
    pub summarizer: String,
    /// The summary text.
    pub summary: String,
    /// When it was stored.
    pub created_at: DateTime<Utc>,
}

/// Storage engine for articles.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    conn: Connection,
}

fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Escape `LIKE` wildcards so `query` matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn json_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Storage {
    /// Open or create a database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a source or update its url and kind, returning its id.
    ///
    /// A `None` url keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_source(&self, name: &str, url: Option<&str>, kind: &str) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO sources (name, url, kind) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                url = COALESCE(excluded.url, sources.url),
                kind = excluded.kind
            ",
            params![name, url, kind],
        )?;
        let id = self
            .conn
            .query_row("SELECT id FROM sources WHERE name = ?1", [name], |row| {
                row.get(0)
            })?;
        Ok(id)
    }

    /// Insert an item.
    ///
    /// Returns the new article id, or `None` if an article with the same
    /// dedup key already exists. The item's source is created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_item(&self, item: &NewsItem) -> Result<Option<i64>> {
        let key = item.dedup_key();
        if self.exists_by_key(&key)? {
            debug!("Skipping duplicate article {}", &key[..16]);
            return Ok(None);
        }

        let source_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM sources WHERE name = ?1",
                [&item.source],
                |row| row.get(0),
            )
            .optional()?;
        let source_id = match source_id {
            Some(id) => id,
            None => self.upsert_source(&item.source, None, item.source_kind())?,
        };

        self.conn.execute(
            r"
            INSERT INTO articles (source_id, item_id, title, link, published, summary,
                                  content, authors, tags, dedup_key, fetched_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                source_id,
                item.id,
                item.title,
                item.link,
                item.published.map(to_db_time),
                item.summary,
                item.content,
                serde_json::to_string(&item.authors)?,
                serde_json::to_string(&item.tags)?,
                key,
                to_db_time(item.fetched_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted article with id {}", id);
        Ok(Some(id))
    }

    fn exists_by_key(&self, key: &str) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE dedup_key = ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get an article by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id \
             WHERE a.id = ?1"
        );
        let article = self
            .conn
            .query_row(&sql, [id], Self::row_to_article)
            .optional()?;
        Ok(article)
    }

    fn query_articles(&self, tail: &str, params: impl rusqlite::Params) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id {tail}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let articles = stmt
            .query_map(params, Self::row_to_article)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    /// The most recently fetched articles, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        self.query_articles(
            "ORDER BY a.fetched_at DESC, a.id DESC LIMIT ?1",
            [limit_param(limit)],
        )
    }

    /// The most recent articles from the named source.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>> {
        self.query_articles(
            "WHERE s.name = ?1 ORDER BY a.fetched_at DESC, a.id DESC LIMIT ?2",
            params![source, limit_param(limit)],
        )
    }

    /// Case-insensitive substring search over title and content,
    /// optionally restricted to one source.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search(&self, query: &str, source: Option<&str>, limit: usize) -> Result<Vec<Article>> {
        let pattern = format!("%{}%", escape_like(query));
        self.query_articles(
            r"
            WHERE (a.title LIKE ?1 ESCAPE '\' OR a.content LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR s.name = ?2)
            ORDER BY a.fetched_at DESC, a.id DESC LIMIT ?3
            ",
            params![pattern, source, limit_param(limit)],
        )
    }

    /// Articles published (or, when undated, fetched) at or after `cutoff`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn since(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<Article>> {
        self.query_articles(
            r"
            WHERE COALESCE(a.published, a.fetched_at) >= ?1
            ORDER BY COALESCE(a.published, a.fetched_at) DESC, a.id DESC LIMIT ?2
            ",
            params![to_db_time(cutoff), limit_param(limit)],
        )
    }

    /// Articles without a summary, oldest first, with articles that failed
    /// to summarize fewer times ahead of those that failed more often.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unsummarized(&self, limit: usize) -> Result<Vec<Article>> {
        self.query_articles(
            r"
            LEFT JOIN summaries m ON m.article_id = a.id
            WHERE m.id IS NULL
            ORDER BY a.summary_attempts ASC, a.fetched_at ASC, a.id ASC LIMIT ?1
            ",
            [limit_param(limit)],
        )
    }

    /// Note a failed summarization so the article yields to others next time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_summary_failure(&self, article_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE articles SET summary_attempts = summary_attempts + 1 WHERE id = ?1",
            [article_id],
        )?;
        Ok(())
    }

    /// Count stored articles.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete an article (and its summary) by id.
    ///
    /// Returns `true` if an article was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Store the summary for an article, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the article does not exist or the database
    /// operation fails.
    pub fn insert_summary(&self, article_id: i64, summarizer: &str, summary: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO summaries (article_id, summarizer, summary, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(article_id) DO UPDATE SET
                summarizer = excluded.summarizer,
                summary = excluded.summary,
                created_at = excluded.created_at
            ",
            params![article_id, summarizer, summary, to_db_time(Utc::now())],
        )?;
        Ok(())
    }

    /// The stored summary for an article.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn summary_for(&self, article_id: i64) -> Result<Option<Summary>> {
        let summary = self
            .conn
            .query_row(
                r"
                SELECT article_id, summarizer, summary, created_at
                FROM summaries WHERE article_id = ?1
                ",
                [article_id],
                |row| {
                    Ok(Summary {
                        article_id: row.get(0)?,
                        summarizer: row.get(1)?,
                        summary: row.get(2)?,
                        created_at: time_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    /// Delete articles fetched before `now - max_age`.
    ///
    /// Returns the number of articles deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let Some(cutoff) = checked_before(Utc::now(), max_age) else {
            debug!("Retention age reaches before year 1, nothing to prune");
            return Ok(0);
        };
        let cutoff = to_db_time(cutoff);
        let affected = self
            .conn
            .execute("DELETE FROM articles WHERE fetched_at < ?1", [cutoff])?;

        if affected > 0 {
            info!("Pruned {} old articles", affected);
        }
        Ok(affected)
    }

    /// Keep only the `keep_count` most recently fetched articles.
    ///
    /// Returns the number of articles deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let affected = self.conn.execute(
            r"
            DELETE FROM articles WHERE id NOT IN (
                SELECT id FROM articles ORDER BY fetched_at DESC, id DESC LIMIT ?1
            )
            ",
            [limit_param(keep_count)],
        )?;

        if affected > 0 {
            info!("Pruned {} articles to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }

    /// Apply both retention rules; a zero disables the rule.
    ///
    /// Returns the number of articles deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn apply_retention(&self, max_age_days: u32, max_articles: usize) -> Result<usize> {
        let mut pruned = 0;
        if max_age_days > 0 {
            pruned += self.prune_older_than(Duration::days(i64::from(max_age_days)))?;
        }
        if max_articles > 0 {
            pruned += self.prune_keep_recent(max_articles)?;
        }
        Ok(pruned)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count_of = |table: &str| -> Result<i64> {
            let count = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(count)
        };

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(fetched_at), MAX(fetched_at) FROM articles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path == Path::new(MEMORY_PATH) {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_articles: count_of("articles")?,
            total_sources: count_of("sources")?,
            total_summaries: count_of("summaries")?,
            oldest_fetch: oldest.as_deref().and_then(from_db_time),
            newest_fetch: newest.as_deref().and_then(from_db_time),
            db_size_bytes,
        })
    }

    fn row_to_article(row: &rusqlite::Row) -> rusqlite::Result<Article> {
        let published: Option<String> = row.get(5)?;
        Ok(Article {
            id: row.get(0)?,
            dedup_key: row.get(10)?,
            item: NewsItem {
                source: row.get(1)?,
                id: row.get(2)?,
                title: row.get(3)?,
                link: row.get(4)?,
                published: published.as_deref().and_then(from_db_time),
                summary: row.get(6)?,
                content: row.get(7)?,
                authors: json_column(row, 8)?,
                tags: json_column(row, 9)?,
                fetched_at: time_column(row, 11)?,
            },
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Total number of articles stored.
    pub total_articles: i64,
    /// Number of known sources.
    pub total_sources: i64,
    /// Number of stored summaries.
    pub total_summaries: i64,
    /// Fetch time of the oldest article.
    pub oldest_fetch: Option<DateTime<Utc>>,
    /// Fetch time of the newest article.
    pub newest_fetch: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
