//! Error types for the page crawler

use chrono::{DateTime, Utc};

/// Result type alias for page crawler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when crawling pages
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the page body failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A site capability was not provided to the crawler
    #[error("{0} not set")]
    MissingCapability(&'static str),

    /// The job string did not split into one or three parts
    #[error("too many URL parts: expected 1 or 3, got {0}")]
    TooManyUrlParts(usize),

    /// An archive bound is not a `YYYY-MM-DD` date
    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The page was fetched but no line yielded a song
    #[error("no results for {url:?}")]
    NoResults { url: String },

    /// The history URL generator did not move the cursor backwards
    #[error("timestamp returned by generate_history_url ({next}) not before current ({current})")]
    NonDecreasingTimestamp {
        next: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// Configuration error (from spmconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error prevents a crawl from starting at all
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingCapability(_)
                | Error::TooManyUrlParts(_)
                | Error::InvalidDate { .. }
                | Error::Config(_)
        )
    }
}
