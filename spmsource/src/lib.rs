//! # SPMSource
//!
//! Common types for SPMusic song sources.
//!
//! A source is a producer that discovers "Artist - Title" identifiers and
//! pushes them, one [`Song`] event at a time, into a channel owned by the
//! consumer that started it. Sources never dedupe across each other and never
//! retry: a failed fetch is reported as a [`Song::Failed`] event and the
//! caller decides what to do next.
//!
//! ## Channel ownership
//!
//! A [`SongSource`] takes the sending half of the channel by value and drops
//! it when its background task ends, so the receiver sees `None` exactly once,
//! after the last event, whatever the reason the task stopped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One event emitted by a source: either a discovered song or an error.
#[derive(Debug)]
pub enum Song {
    /// A discovered "Artist - Title" identifier
    Found(String),
    /// A fetch or extraction failure; carries no title
    Failed(anyhow::Error),
}

impl Song {
    pub fn found(artist_title: impl Into<String>) -> Self {
        Song::Found(artist_title.into())
    }

    pub fn failed(error: impl Into<anyhow::Error>) -> Self {
        Song::Failed(error.into())
    }

    /// The identifier, if this event carries one
    pub fn artist_title(&self) -> Option<&str> {
        match self {
            Song::Found(title) => Some(title),
            Song::Failed(_) => None,
        }
    }

    /// The error, if this event carries one
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Song::Found(_) => None,
            Song::Failed(err) => Some(err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Song::Failed(_))
    }

    /// Converts the event into a `Result`, which is handy with `?`
    pub fn into_result(self) -> anyhow::Result<String> {
        match self {
            Song::Found(title) => Ok(title),
            Song::Failed(err) => Err(err),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Song::Found(title) => f.write_str(title),
            Song::Failed(err) => write!(f, "error: {err}"),
        }
    }
}

/// Job description handed to a source.
///
/// `source_url` is opaque to the caller; each source decodes it its own way
/// (a stream URL, a page URL, or a `base|start|end` triple).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceJob {
    pub source_url: String,
}

impl SourceJob {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }
}

impl From<&str> for SourceJob {
    fn from(source_url: &str) -> Self {
        Self::new(source_url)
    }
}

/// A producer of [`Song`] events running in its own task.
///
/// `start` validates the job synchronously and returns an error without
/// spawning anything if it is malformed. Otherwise it spawns the work and
/// returns immediately. The spawned task owns `songs` and drops it on every
/// exit path, and it watches `cancel` between fetches.
///
/// Must be called from within a Tokio runtime.
pub trait SongSource: Send + Sync {
    fn start(
        &self,
        cancel: CancellationToken,
        job: SourceJob,
        songs: mpsc::Sender<Song>,
    ) -> anyhow::Result<()>;
}
