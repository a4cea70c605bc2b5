//! Example: Fetch and print a podcast feed
//!
//! Run with: cargo run -p podfeed --example fetch_feed -- https://example.com/feed.xml

use anyhow::Context;
use podfeed::{EpisodeLimit, FeedFetcher};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let url = env::args()
        .nth(1)
        .context("usage: fetch_feed <feed-url>")?;

    let fetcher = FeedFetcher::builder()
        .episode_limit(EpisodeLimit::Latest(10))
        .build()?;

    println!("Fetching {url}...\n");
    let podcast = fetcher.fetch(&url).await?;

    println!("{}", podcast.title);
    if !podcast.description.is_empty() {
        println!("{}", podcast.description);
    }
    println!("---");

    for episode in &podcast.episodes {
        println!("{}", episode.title);
        if !episode.published.is_empty() {
            println!("  published: {}", episode.published);
        }
        if let Some(duration) = &episode.duration {
            println!("  duration: {duration}");
        }
        println!("  audio: {}", episode.audio_url);
    }

    Ok(())
}
