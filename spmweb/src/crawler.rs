//! Page crawler: live and archive crawl tasks

use crate::config_ext::WebConfigExt;
use crate::error::{Error, Result};
use crate::page::fetch_page_songs;
use crate::plan::CrawlPlan;
use crate::rules::{HistoryUrlGenerator, SongExtractor};
use chrono::{DateTime, Datelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use spmconfig::Config;
use spmsource::{Song, SongSource, SourceJob};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound of the random delay before a live fetch
pub const DEFAULT_INITIAL_SLEEP: Duration = Duration::from_secs(10);

/// Default timeout for page requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent, shared with the configuration default
pub const DEFAULT_USER_AGENT: &str = spmconfig::DEFAULT_USER_AGENT;

/// Calendar month whose history pages are never fetched (seasonal noise)
pub const EXCLUDED_MONTH: u32 = 12;

/// Crawls song lists out of web pages.
///
/// A job is either a single page URL (live mode) or
/// `url_base|YYYY-MM-DD|YYYY-MM-DD` (archive mode, walked from the end date
/// back to the start date through the [`HistoryUrlGenerator`]).
///
/// Each crawler owns its random source for the live-mode start jitter, so
/// many crawlers started together spread their first requests out.
///
/// # Example
///
/// ```no_run
/// use spmsource::{SourceJob, Song};
/// use spmweb::PageCrawler;
/// use chrono::{DateTime, Duration, Utc};
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let crawler = PageCrawler::builder()
///     .song_extractor(|line: &str| -> Vec<String> {
///         line.strip_prefix("<td>").map(|s| vec![s.to_string()]).unwrap_or_default()
///     })
///     .history_url_generator(|base: &str, t: DateTime<Utc>| {
///         (format!("{base}/{}", t.format("%Y%m%d")), t - Duration::weeks(1))
///     })
///     .build()?;
///
/// let (tx, mut rx) = mpsc::channel(64);
/// crawler.start(
///     CancellationToken::new(),
///     SourceJob::new("https://charts.example.com|2020-01-01|2020-03-01"),
///     tx,
/// )?;
/// while let Some(song) = rx.recv().await {
///     match song {
///         Song::Found(title) => println!("{title}"),
///         Song::Failed(err) => eprintln!("{err}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PageCrawler {
    client: Client,
    extractor: Option<Arc<dyn SongExtractor>>,
    history: Option<Arc<dyn HistoryUrlGenerator>>,
    initial_sleep: Duration,
    rng: Mutex<StdRng>,
}

impl PageCrawler {
    /// Create a builder for configuring the crawler
    pub fn builder() -> PageCrawlerBuilder {
        PageCrawlerBuilder::default()
    }

    /// Validates `job` and spawns the crawl.
    ///
    /// Returns an error, without spawning anything, if a capability is
    /// missing or the job string is malformed. Otherwise the crawl runs in a
    /// Tokio task that owns `songs` and closes it once done, whatever the
    /// outcome. Page failures arrive as [`Song::Failed`] events.
    ///
    /// `cancel` is checked between page fetches; a fetch already in flight
    /// completes first.
    pub fn start(
        &self,
        cancel: CancellationToken,
        job: SourceJob,
        songs: mpsc::Sender<Song>,
    ) -> Result<()> {
        let extractor = self
            .extractor
            .clone()
            .ok_or(Error::MissingCapability("extract_songs"))?;
        let history = self
            .history
            .clone()
            .ok_or(Error::MissingCapability("generate_history_url"))?;

        let plan = CrawlPlan::parse(&job.source_url)?;
        let task = CrawlTask {
            client: self.client.clone(),
            extractor,
            history,
            cancel,
            songs,
        };

        match plan {
            CrawlPlan::Live { url } => {
                let delay = self.initial_delay();
                tokio::spawn(task.run_live(url, delay));
            }
            CrawlPlan::Archive {
                url_base,
                start,
                end,
            } => {
                tokio::spawn(task.run_archive(url_base, start, end));
            }
        }
        Ok(())
    }

    /// Draws the live-mode start delay, uniform in `[0, initial_sleep)`
    fn initial_delay(&self) -> Duration {
        let bound = self.initial_sleep.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Duration::from_millis(rng.random_range(0..bound))
    }
}

impl SongSource for PageCrawler {
    fn start(
        &self,
        cancel: CancellationToken,
        job: SourceJob,
        songs: mpsc::Sender<Song>,
    ) -> anyhow::Result<()> {
        PageCrawler::start(self, cancel, job, songs)?;
        Ok(())
    }
}

/// Builder for [`PageCrawler`]
#[derive(Default)]
pub struct PageCrawlerBuilder {
    client: Option<Client>,
    extractor: Option<Arc<dyn SongExtractor>>,
    history: Option<Arc<dyn HistoryUrlGenerator>>,
    initial_sleep: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    seed: Option<u64>,
}

impl PageCrawlerBuilder {
    /// Start from the `web` and `http` configuration sections
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::default()
            .initial_sleep_bound(config.get_web_initial_sleep()?)
            .request_timeout(config.get_web_request_timeout()?)
            .user_agent(config.get_user_agent()?))
    }

    /// Use a custom reqwest client (timeout and UA settings are ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn song_extractor(mut self, extractor: impl SongExtractor + 'static) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    pub fn history_url_generator(mut self, generator: impl HistoryUrlGenerator + 'static) -> Self {
        self.history = Some(Arc::new(generator));
        self
    }

    /// Upper bound of the random live-mode start delay (zero disables it)
    pub fn initial_sleep_bound(mut self, bound: Duration) -> Self {
        self.initial_sleep = Some(bound);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Seed the jitter source for reproducible start delays
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the crawler.
    ///
    /// Missing capabilities are not an error here; [`PageCrawler::start`]
    /// reports them.
    pub fn build(self) -> Result<PageCrawler> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(
                    self.request_timeout
                        .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
                )
                .user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
                .build()?,
        };
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(PageCrawler {
            client,
            extractor: self.extractor,
            history: self.history,
            initial_sleep: self.initial_sleep.unwrap_or(DEFAULT_INITIAL_SLEEP),
            rng: Mutex::new(rng),
        })
    }
}

/// State moved into the spawned crawl; dropping it closes `songs`.
struct CrawlTask {
    client: Client,
    extractor: Arc<dyn SongExtractor>,
    history: Arc<dyn HistoryUrlGenerator>,
    cancel: CancellationToken,
    songs: mpsc::Sender<Song>,
}

impl CrawlTask {
    async fn run_live(self, url: String, delay: Duration) {
        info!(url = %url, delay_ms = delay.as_millis() as u64, "Starting web source");

        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    info!(url = %url, "Web source cancelled before fetch");
                    return;
                }
            }
        } else if self.cancel.is_cancelled() {
            return;
        }

        self.crawl_page(&url).await;
    }

    async fn run_archive(self, url_base: String, start: DateTime<Utc>, end: DateTime<Utc>) {
        info!(url_base = %url_base, %start, %end, "Starting historical web source");

        let mut t = end;
        while t >= start {
            if self.cancel.is_cancelled() {
                info!(url_base = %url_base, cursor = %t, "Historical web source cancelled");
                return;
            }

            let next = if t.month() == EXCLUDED_MONTH {
                let (_, next) = self.history.history_url(&url_base, t);
                debug!(cursor = %t, "Skipping excluded month");
                next
            } else {
                let (url, next) = self.history.history_url(&url_base, t);
                if !self.crawl_page(&url).await {
                    return;
                }
                next
            };

            if next >= t {
                let err = Error::NonDecreasingTimestamp { next, current: t };
                warn!(url_base = %url_base, error = %err, "Stopping historical web source");
                self.emit(Song::failed(err)).await;
                return;
            }
            t = next;
        }

        info!(url_base = %url_base, "Historical web source finished");
    }

    /// Fetches one page and emits its songs, or one error event.
    /// Returns false when the receiver is gone.
    async fn crawl_page(&self, url: &str) -> bool {
        match fetch_page_songs(&self.client, url, &*self.extractor).await {
            Ok(found) => {
                for artist_title in found {
                    if !self.emit(Song::found(artist_title)).await {
                        return false;
                    }
                }
                true
            }
            Err(err) => {
                warn!(url, error = %err, "Page crawl failed");
                self.emit(Song::failed(err)).await
            }
        }
    }

    async fn emit(&self, song: Song) -> bool {
        if self.songs.send(song).await.is_err() {
            debug!("Song receiver dropped, stopping crawl");
            return false;
        }
        true
    }
}
