//! Site capabilities injected into the crawler
//!
//! Both traits have blanket implementations for closures, so site rules can
//! be plain functions:
//!
//! ```
//! use chrono::{DateTime, Duration, Utc};
//! use spmweb::{HistoryUrlGenerator, SongExtractor};
//!
//! let extract = |line: &str| -> Vec<String> {
//!     line.strip_prefix("<li>")
//!         .and_then(|rest| rest.strip_suffix("</li>"))
//!         .map(|song| vec![song.to_string()])
//!         .unwrap_or_default()
//! };
//! assert_eq!(extract.extract_songs("<li>A - B</li>"), vec!["A - B"]);
//!
//! let weekly = |base: &str, t: DateTime<Utc>| {
//!     (format!("{base}/{}", t.format("%Y-%m-%d")), t - Duration::weeks(1))
//! };
//! let (url, _previous) = weekly.history_url("http://charts.example", Utc::now());
//! assert!(url.starts_with("http://charts.example/"));
//! ```

use chrono::{DateTime, Utc};

/// Pulls song identifiers out of one line of page content.
pub trait SongExtractor: Send + Sync {
    /// Returns zero or more "Artist - Title" identifiers, in page order.
    fn extract_songs(&self, line: &str) -> Vec<String>;
}

impl<F> SongExtractor for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn extract_songs(&self, line: &str) -> Vec<String> {
        self(line)
    }
}

/// Maps a base identifier and a point in time to a page of history.
pub trait HistoryUrlGenerator: Send + Sync {
    /// Returns the page URL for `t` and the timestamp of the next older page.
    ///
    /// The returned timestamp must be strictly before `t`; the crawler stops
    /// with an error otherwise. A site publishing weekly would return
    /// `t` minus one week.
    fn history_url(&self, url_base: &str, t: DateTime<Utc>) -> (String, DateTime<Utc>);
}

impl<F> HistoryUrlGenerator for F
where
    F: Fn(&str, DateTime<Utc>) -> (String, DateTime<Utc>) + Send + Sync,
{
    fn history_url(&self, url_base: &str, t: DateTime<Utc>) -> (String, DateTime<Utc>) {
        self(url_base, t)
    }
}
