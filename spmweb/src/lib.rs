//! Web page song crawler for SPMusic
//!
//! Fetches HTML pages and turns their content into [`spmsource::Song`]
//! events, line by line, through site-specific rules supplied by the caller.
//!
//! # Modes
//!
//! - **Live**: the job is a single URL, fetched once after a short random
//!   delay.
//! - **Archive**: the job is `url_base|start|end` with `YYYY-MM-DD` dates.
//!   The crawler walks backwards from `end` to `start`, asking the
//!   [`HistoryUrlGenerator`] for each page and for the previous timestamp.
//!   December pages are skipped; a failed page is reported and the walk goes
//!   on; a generator that does not move backwards stops the walk.
//!
//! # Site rules
//!
//! [`SongExtractor`] and [`HistoryUrlGenerator`] are the two capabilities a
//! site module provides. Both are implemented for plain closures.

pub mod config_ext;
pub mod crawler;
pub mod error;
pub mod page;
pub mod plan;
pub mod rules;

pub use config_ext::WebConfigExt;
pub use crawler::{
    PageCrawler, PageCrawlerBuilder, DEFAULT_INITIAL_SLEEP, DEFAULT_USER_AGENT, EXCLUDED_MONTH,
};
pub use error::{Error, Result};
pub use page::fetch_page_songs;
pub use plan::CrawlPlan;
pub use rules::{HistoryUrlGenerator, SongExtractor};
