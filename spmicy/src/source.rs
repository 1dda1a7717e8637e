//! [`SongSource`] adapter turning stream titles into [`Song`] events

use crate::decoder::IcyDecoder;
use spmsource::{Song, SongSource, SourceJob};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Capacity of the internal title channel between decoder and forwarder
const TITLE_BUFFER: usize = 16;

/// Runs an [`IcyDecoder`] in the background for a stream URL job.
///
/// Every new title becomes a [`Song::Found`]. When the decoder gives up, its
/// error is sent as a single [`Song::Failed`] and the song channel closes.
/// Cancellation closes the channel without a final error event.
#[derive(Debug, Clone)]
pub struct IcySource {
    decoder: IcyDecoder,
    label: String,
}

impl IcySource {
    pub fn new(decoder: IcyDecoder, label: impl Into<String>) -> Self {
        Self {
            decoder,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl SongSource for IcySource {
    fn start(
        &self,
        cancel: CancellationToken,
        job: SourceJob,
        songs: mpsc::Sender<Song>,
    ) -> anyhow::Result<()> {
        url::Url::parse(&job.source_url).map_err(crate::Error::from)?;

        let decoder = self.decoder.clone();
        let label = self.label.clone();
        tokio::spawn(forward_titles(decoder, job.source_url, label, cancel, songs));
        Ok(())
    }
}

async fn forward_titles(
    decoder: IcyDecoder,
    stream_url: String,
    label: String,
    cancel: CancellationToken,
    songs: mpsc::Sender<Song>,
) {
    let (title_tx, mut title_rx) = mpsc::channel(TITLE_BUFFER);
    let session = decoder.open(&stream_url, &label, &title_tx);
    tokio::pin!(session);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(source = %label, "Stream source cancelled");
                break;
            }
            Some(title) = title_rx.recv() => {
                if songs.send(Song::found(title)).await.is_err() {
                    debug!(source = %label, "Song receiver dropped");
                    break;
                }
            }
            err = &mut session => {
                // titles queued before the failure still go out first
                while let Ok(title) = title_rx.try_recv() {
                    if songs.send(Song::found(title)).await.is_err() {
                        return;
                    }
                }
                info!(source = %label, error = %err, "Stream source stopped");
                let _ = songs.send(Song::failed(err)).await;
                break;
            }
        }
    }
}
