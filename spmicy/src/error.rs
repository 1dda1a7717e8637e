//! Error types for the ICY title decoder

use chrono::{DateTime, Utc};

/// Result type alias for ICY decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a decoding session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request could not be built or sent
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the stream body failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid stream URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server closed the stream
    #[error("end of stream")]
    EndOfStream,

    /// No new title was seen within the configured timeout
    #[error(
        "title timeout, last title {last_title:?} found at {}",
        .since.format("%Y-%m-%d %H:%M:%S")
    )]
    TitleTimeout {
        last_title: String,
        since: DateTime<Utc>,
    },

    /// The receiving side of the title channel was dropped
    #[error("title channel closed by receiver")]
    ChannelClosed,

    /// Configuration error (from spmconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
