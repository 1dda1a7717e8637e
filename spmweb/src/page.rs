//! Fetch one page and run every line through the song extractor

use crate::error::{Error, Result};
use crate::rules::SongExtractor;
use futures::TryStreamExt;
use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

/// Fetches `url` and returns the songs found on it, in page order.
///
/// A page that loads fine but yields nothing is reported as
/// [`Error::NoResults`]: an empty page and a broken extraction rule look the
/// same from here.
pub async fn fetch_page_songs(
    client: &Client,
    url: &str,
    extractor: &dyn SongExtractor,
) -> Result<Vec<String>> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        warn!(url, status = %response.status(), "Page returned non-success status");
    }

    let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
    let songs = extract_songs_from_reader(StreamReader::new(body), extractor).await?;
    debug!(url, count = songs.len(), "Page returned results");

    if songs.is_empty() {
        return Err(Error::NoResults {
            url: url.to_string(),
        });
    }
    Ok(songs)
}

/// Runs `extractor` over each `\n`-terminated line of `reader`.
///
/// Line terminators (`\n` or `\r\n`) are stripped and invalid UTF-8 is
/// replaced before the line reaches the extractor.
pub async fn extract_songs_from_reader<R>(
    mut reader: R,
    extractor: &dyn SongExtractor,
) -> std::io::Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut songs = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        songs.extend(extractor.extract_songs(text));
    }

    Ok(songs)
}
