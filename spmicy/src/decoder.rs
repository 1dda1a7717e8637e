//! ICY stream reader

use crate::config_ext::IcyConfigExt;
use crate::error::{Error, Result};
use crate::scan::{find_stream_title, METADATA_TERMINATOR};
use crate::tracker::TitleTracker;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use reqwest::Client;
use spmconfig::Config;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tracing::{debug, info, trace, warn};

/// Header asking the server to interleave metadata blocks in the stream
pub const METADATA_REQUEST_HEADER: &str = "Icy-MetaData";

/// Default delay without a new title before the stream is considered stale
pub const DEFAULT_TITLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default timeout for establishing the connection
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent, shared with the configuration default
pub const DEFAULT_USER_AGENT: &str = spmconfig::DEFAULT_USER_AGENT;

/// Capacity kept by the chunk buffer between reads
const RETAINED_CHUNK_CAPACITY: usize = 16 * 1024;

/// Reads an internet radio stream and reports each new `StreamTitle`.
///
/// The decoder is cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use spmicy::IcyDecoder;
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let decoder = IcyDecoder::new()?;
///     let (tx, mut rx) = mpsc::channel(16);
///
///     tokio::spawn(async move {
///         while let Some(title) = rx.recv().await {
///             println!("Now playing: {title}");
///         }
///     });
///
///     let err = decoder.open("http://radio.example.com/stream", "example", &tx).await;
///     eprintln!("stream ended: {err}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct IcyDecoder {
    client: Client,
    title_timeout: Duration,
}

impl IcyDecoder {
    /// Create a decoder with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the decoder
    pub fn builder() -> IcyDecoderBuilder {
        IcyDecoderBuilder::default()
    }

    /// Create a decoder from the `icy` and `http` configuration sections
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder()
            .title_timeout(config.get_icy_title_timeout()?)
            .connect_timeout(config.get_icy_connect_timeout()?)
            .user_agent(config.get_user_agent()?)
            .build()
    }

    pub fn title_timeout(&self) -> Duration {
        self.title_timeout
    }

    /// Opens `stream_url` and pushes every new title into `titles`.
    ///
    /// Runs on the caller's task until the session fails and returns the
    /// reason: a connection error (before any title is sent), a read error,
    /// [`Error::EndOfStream`], [`Error::TitleTimeout`] or
    /// [`Error::ChannelClosed`]. There is no successful return.
    ///
    /// `titles` is only borrowed: the caller keeps ownership of the channel
    /// and decides when to close it. `label` only appears in log records.
    pub async fn open(
        &self,
        stream_url: &str,
        label: &str,
        titles: &mpsc::Sender<String>,
    ) -> Error {
        info!(source = label, url = stream_url, "Starting stream");

        let response = match self.connect(stream_url).await {
            Ok(response) => response,
            Err(err) => return err,
        };
        if !response.status().is_success() {
            warn!(
                source = label,
                status = %response.status(),
                "Stream returned non-success status"
            );
        }
        if let Some(interval) = response.headers().get("icy-metaint") {
            debug!(source = label, metaint = ?interval, "Server advertised metadata interval");
        }

        let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let reader = StreamReader::new(body);

        decode_titles(reader, label, titles, self.title_timeout, Utc::now).await
    }

    async fn connect(&self, stream_url: &str) -> Result<reqwest::Response> {
        let url = url::Url::parse(stream_url)?;
        let response = self
            .client
            .get(url)
            .header(METADATA_REQUEST_HEADER, "1")
            .send()
            .await?;
        Ok(response)
    }
}

/// Builder for [`IcyDecoder`]
#[derive(Debug, Default)]
pub struct IcyDecoderBuilder {
    client: Option<Client>,
    title_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl IcyDecoderBuilder {
    /// Use a custom reqwest client (connection and UA settings are ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Time without a new title after which the session fails
    pub fn title_timeout(mut self, timeout: Duration) -> Self {
        self.title_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<IcyDecoder> {
        let client = match self.client {
            Some(client) => client,
            // no overall request timeout: the stream stays open for hours
            None => Client::builder()
                .connect_timeout(
                    self.connect_timeout
                        .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
                )
                .user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
                .build()?,
        };

        Ok(IcyDecoder {
            client,
            title_timeout: self.title_timeout.unwrap_or(DEFAULT_TITLE_TIMEOUT),
        })
    }
}

/// Scans `reader` chunk by chunk until it fails.
///
/// `clock` is read once when reading starts and once per chunk; the
/// staleness check runs after every chunk, title or not.
pub(crate) async fn decode_titles<R, C>(
    mut reader: R,
    label: &str,
    titles: &mpsc::Sender<String>,
    title_timeout: Duration,
    mut clock: C,
) -> Error
where
    R: AsyncBufRead + Unpin,
    C: FnMut() -> DateTime<Utc>,
{
    let mut tracker = TitleTracker::new(title_timeout, clock());
    let mut chunk = Vec::new();

    loop {
        reset_chunk(&mut chunk);
        match reader.read_until(METADATA_TERMINATOR, &mut chunk).await {
            Ok(0) => return Error::EndOfStream,
            Ok(_) => {}
            Err(err) => return Error::Io(err),
        }
        trace!(source = label, len = chunk.len(), "Read chunk");

        let now = clock();
        if let Some(title) = tracker.observe(find_stream_title(&chunk), now) {
            info!(source = label, title = %title, "New title found");
            if titles.send(title).await.is_err() {
                return Error::ChannelClosed;
            }
        }

        if let Err(err) = tracker.check_stale(now) {
            warn!(source = label, error = %err, "Stream went stale");
            return err;
        }
    }
}

/// Empties the buffer and gives back memory grown by an oversized chunk
fn reset_chunk(chunk: &mut Vec<u8>) {
    chunk.clear();
    chunk.shrink_to(RETAINED_CHUNK_CAPACITY);
}
