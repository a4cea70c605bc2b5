//! Cross-session playback memory for the podcast client core
//!
//! Persists per-episode playback positions so a listener can pick an
//! episode back up where they left it, across application restarts.
//!
//! - One flat JSON document on disk, written atomically (temp file +
//!   rename), with rate-limited flushes
//! - Resume eligibility policy: enough progress, not already finished,
//!   played recently enough; malformed timestamps fail safe
//! - Recency queries and listening statistics for the UI collaborator
//!
//! # Example
//!
//! ```no_run
//! use podresume::ResumeStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ResumeStore::new("data/playback_positions.json")?;
//!
//!     store.update_position("https://x/ep1.mp3", "Episode 1", 450.0, 1800.0);
//!
//!     if let Some(saved) = store.get_resume_position("https://x/ep1.mp3") {
//!         println!("Resume at {}", saved.resume_time_formatted());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod position;
pub mod store;

// Re-exports
pub use error::{Error, Result};
pub use position::PlaybackPosition;
pub use store::{ResumeConfig, ResumeStatistics, ResumeStore};
