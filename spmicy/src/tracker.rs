//! Title deduplication and staleness detection

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Keeps the last emitted title and when it was seen.
///
/// Novelty is judged against the previous title only, so `A, B, A` yields
/// three new titles. The tracker takes the current time as an argument and
/// never reads a clock itself.
#[derive(Debug, Clone)]
pub struct TitleTracker {
    last_title: String,
    last_title_at: DateTime<Utc>,
    timeout: Duration,
}

impl TitleTracker {
    /// Creates a tracker whose staleness clock starts at `started_at`
    pub fn new(timeout: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            last_title: String::new(),
            last_title_at: started_at,
            timeout,
        }
    }

    /// Records a scanned title and returns it if it should be emitted.
    pub fn observe(&mut self, title: Option<String>, now: DateTime<Utc>) -> Option<String> {
        let title = title.filter(|t| !t.is_empty() && *t != self.last_title)?;
        self.last_title.clone_from(&title);
        self.last_title_at = now;
        Some(title)
    }

    /// Fails once `timeout` has elapsed since the last emitted title.
    pub fn check_stale(&self, now: DateTime<Utc>) -> Result<()> {
        // a clock going backwards counts as no time elapsed
        let elapsed = (now - self.last_title_at).to_std().unwrap_or_default();
        if elapsed >= self.timeout {
            return Err(Error::TitleTimeout {
                last_title: self.last_title.clone(),
                since: self.last_title_at,
            });
        }
        Ok(())
    }

    pub fn last_title(&self) -> &str {
        &self.last_title
    }

    pub fn last_title_at(&self) -> DateTime<Utc> {
        self.last_title_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn titles(seq: &[&str]) -> Vec<String> {
        let mut tracker = TitleTracker::new(Duration::from_secs(1800), at(0));
        seq.iter()
            .enumerate()
            .filter_map(|(i, t)| tracker.observe(Some(t.to_string()), at(i as i64)))
            .collect()
    }

    #[test]
    fn test_repeated_title_emitted_once() {
        assert_eq!(titles(&["A", "A"]), vec!["A"]);
    }

    #[test]
    fn test_only_previous_title_counts() {
        assert_eq!(titles(&["A", "B", "A"]), vec!["A", "B", "A"]);
    }

    #[test]
    fn test_empty_and_missing_titles_ignored() {
        let mut tracker = TitleTracker::new(Duration::from_secs(1800), at(0));
        assert_eq!(tracker.observe(None, at(1)), None);
        assert_eq!(tracker.observe(Some(String::new()), at(2)), None);
        assert_eq!(tracker.last_title_at(), at(0));
        assert_eq!(tracker.observe(Some("A".into()), at(3)).as_deref(), Some("A"));
        assert_eq!(tracker.last_title(), "A");
        assert_eq!(tracker.last_title_at(), at(3));
    }

    #[test]
    fn test_staleness_measured_from_last_emitted_title() {
        let mut tracker = TitleTracker::new(Duration::from_secs(30 * 60), at(0));
        assert!(tracker.check_stale(at(29)).is_ok());

        tracker.observe(Some("A".into()), at(20));
        // repeats do not refresh the timestamp
        tracker.observe(Some("A".into()), at(45));
        assert!(tracker.check_stale(at(49)).is_ok());

        match tracker.check_stale(at(50)) {
            Err(Error::TitleTimeout { last_title, since }) => {
                assert_eq!(last_title, "A");
                assert_eq!(since, at(20));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_message_reports_timestamp() {
        let tracker = TitleTracker::new(Duration::from_secs(60), at(0));
        let err = tracker.check_stale(at(5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "title timeout, last title \"\" found at 2024-03-01 12:00:00"
        );
    }

    #[test]
    fn test_clock_going_backwards() {
        let tracker = TitleTracker::new(Duration::from_secs(60), at(10));
        assert!(tracker.check_stale(at(0)).is_ok());
    }
}
