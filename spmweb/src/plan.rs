//! Decoding of a job string into a crawl plan

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Separator between the parts of an archive job string
pub const URL_PART_SEPARATOR: char = '|';

/// Date format of archive bounds
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// What a page crawl will fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlPlan {
    /// A single page, fetched once
    Live { url: String },
    /// History pages from `end` back to `start`, both inclusive
    Archive {
        url_base: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl CrawlPlan {
    /// Parses `url` or `url_base|YYYY-MM-DD|YYYY-MM-DD`.
    ///
    /// ```
    /// use spmweb::CrawlPlan;
    ///
    /// let plan = CrawlPlan::parse("http://x|2020-01-01|2020-01-08").unwrap();
    /// assert!(matches!(plan, CrawlPlan::Archive { .. }));
    /// assert!(CrawlPlan::parse("http://x|2020-01-01").is_err());
    /// ```
    pub fn parse(source_url: &str) -> Result<Self> {
        let parts: Vec<&str> = source_url.split(URL_PART_SEPARATOR).collect();
        match parts.as_slice() {
            [url] => Ok(CrawlPlan::Live {
                url: url.to_string(),
            }),
            [url_base, start, end] => Ok(CrawlPlan::Archive {
                url_base: url_base.to_string(),
                start: parse_date(start)?,
                end: parse_date(end)?,
            }),
            other => Err(Error::TooManyUrlParts(other.len())),
        }
    }
}

/// Parses a `YYYY-MM-DD` date as midnight UTC
fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| Error::InvalidDate {
        value: value.to_string(),
        source,
    })?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}
