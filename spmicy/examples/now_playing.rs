//! Example: print the titles announced by an internet radio stream
//!
//! Run with: cargo run -p spmicy --example now_playing -- <stream-url>

use spmconfig::get_config;
use spmicy::IcyDecoder;
use std::env;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = env::args()
        .nth(1)
        .unwrap_or_else(|| "http://ice1.somafm.com/groovesalad-128-mp3".to_string());

    let decoder = IcyDecoder::from_config(&get_config())?;
    let (tx, mut rx) = mpsc::channel(16);

    let printer = tokio::spawn(async move {
        while let Some(title) = rx.recv().await {
            println!("Now playing: {}", title);
        }
    });

    let err = decoder.open(&url, "example", &tx).await;
    drop(tx);
    printer.await?;

    println!("Stream ended: {}", err);
    Ok(())
}
