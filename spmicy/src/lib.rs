//! ICY stream title decoder for SPMusic
//!
//! This crate listens to internet radio streams that interleave ICY metadata
//! blocks (`StreamTitle='Artist - Title';`) with the audio, and reports each
//! new title as it changes.
//!
//! # Features
//!
//! - **Marker scan**: [`find_stream_title`] extracts a title from one
//!   `;`-delimited chunk without reading past it
//! - **Dedup**: a title is reported only when it differs from the previous one
//! - **Staleness detection**: a stream that goes 30 minutes (configurable)
//!   without a new title is abandoned with [`Error::TitleTimeout`]
//! - **Song source**: [`IcySource`] runs the decoder as a background
//!   [`spmsource::SongSource`]
//!
//! # Channel ownership
//!
//! [`IcyDecoder::open`] borrows the title sender and never closes it; the
//! caller owns the channel. [`IcySource`] owns its song sender and closes it
//! when the stream ends.
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(16);
//!     tokio::spawn(async move {
//!         while let Some(title) = rx.recv().await {
//!             println!("{title}");
//!         }
//!     });
//!     let err = spmicy::open("http://radio.example.com/stream", "example", &tx).await;
//!     eprintln!("stream ended: {err}");
//! }
//! ```

pub mod config_ext;
pub mod decoder;
pub mod error;
pub mod scan;
pub mod source;
pub mod tracker;

pub use config_ext::IcyConfigExt;
pub use decoder::{
    IcyDecoder, IcyDecoderBuilder, DEFAULT_TITLE_TIMEOUT, DEFAULT_USER_AGENT,
    METADATA_REQUEST_HEADER,
};
pub use error::{Error, Result};
pub use scan::{find_stream_title, METADATA_TERMINATOR, STREAM_TITLE_MARKER};
pub use source::IcySource;
pub use tracker::TitleTracker;

use tokio::sync::mpsc;

/// Opens a stream with default decoder settings.
///
/// See [`IcyDecoder::open`]; the returned error is the reason the session
/// ended.
pub async fn open(stream_url: &str, label: &str, titles: &mpsc::Sender<String>) -> Error {
    match IcyDecoder::new() {
        Ok(decoder) => decoder.open(stream_url, label, titles).await,
        Err(err) => err,
    }
}
