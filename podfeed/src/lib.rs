//! Feed retrieval for the podcast client core
//!
//! This crate fetches and parses remote RSS feeds into structured episode
//! records, with the failure handling a podcast client needs in practice:
//!
//! - **Timeout + retry**: transient network failures (connect errors,
//!   timeouts, 5xx) are retried with exponential backoff, capped at 60 s
//! - **Cooperative cancellation**: one fetch in flight per fetcher; a new
//!   fetch cancels the previous worker, even mid-backoff
//! - **Tolerant parsing**: items without a playable audio enclosure are
//!   dropped silently; only a feed with zero playable episodes is an error
//!
//! # Example
//!
//! ```no_run
//! use podfeed::{EpisodeLimit, FeedFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = FeedFetcher::builder()
//!         .episode_limit(EpisodeLimit::Latest(10))
//!         .build()?;
//!
//!     let podcast = fetcher.fetch("https://example.com/feed.xml").await?;
//!     println!("{}: {} episodes", podcast.title, podcast.episode_count());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod models;
pub mod rss;

// Re-exports
pub use error::{Error, Result};
pub use fetcher::{EpisodeLimit, FeedFetcher, FetchCallbacks, FetcherBuilder};
pub use models::{Episode, Podcast};
