//! Error types for newsagg.
//!
//! Every fallible operation in the library returns [`Result`], whose error
//! carries enough context (URL, path, backend name) to be logged as-is.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for newsagg operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Network Errors ===
    /// An HTTP request could not be completed.
    #[error("request to {url} failed: {source}")]
    Http {
        /// The requested URL.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A URL could not be parsed or is not usable for the operation.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // === Ingestion Errors ===
    /// Neither the URL nor any feed it advertises parsed as RSS/Atom.
    #[error("no RSS or Atom feed found at {url}")]
    FeedNotFound {
        /// The URL that was resolved.
        url: String,
    },

    /// A feed document was malformed.
    #[error("failed to parse feed from {url}: {message}")]
    FeedParse {
        /// Where the feed came from.
        url: String,
        /// Parser message.
        message: String,
    },

    // === Summarizer Errors ===
    /// A summarizer backend failed.
    #[error("summarizer '{backend}' failed: {message}")]
    Summarizer {
        /// Name of the summarizer backend.
        backend: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[error("failed to write {path}: {source}")]
    OutputWrite {
        /// Path of the output file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rendering an HTML template failed.
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// A specialized Result type for newsagg operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a summarizer error for the named backend.
    #[must_use]
    pub fn summarizer(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Summarizer {
            backend,
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

}
