//! Playback session coordination for the podcast client core
//!
//! Drives an audio backend behind a generation-checked state machine:
//! every play and stop bumps a monotonic counter, worker tasks capture
//! the value at bind time, and a worker whose generation is no longer
//! current goes silent instead of mutating state that now belongs to a
//! newer request. Rapid play/play/stop sequences therefore always settle
//! on the last request, with no callbacks from abandoned ones.
//!
//! - [`MediaBackend`] is the seam to the real audio stack
//! - [`PlaybackSession`] owns state, volume, rate, seek, and pause
//! - [`ProgressMonitor`] samples position and reports natural completion
//! - [`Track`] normalizes feed episodes into playable items
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use podplayback::{MediaBackend, PlaybackCallbacks, PlaybackSession};
//!
//! fn listen(backend: Arc<dyn MediaBackend>) {
//!     let session = PlaybackSession::new(backend);
//!     let callbacks = PlaybackCallbacks {
//!         on_progress: Some(Arc::new(|pos, dur| println!("{pos}/{dur}"))),
//!         ..PlaybackCallbacks::default()
//!     };
//!     session.play("https://x/ep1.mp3", "Episode 1", callbacks);
//! }
//! ```

pub mod backend;
pub mod error;
pub mod monitor;
pub mod session;
pub mod state;
pub mod track;

// Re-exports
pub use backend::MediaBackend;
pub use error::{Error, Result};
pub use monitor::ProgressMonitor;
pub use session::{PlaybackCallbacks, PlaybackSession, SessionConfig};
pub use state::{is_supported_rate, PlaybackState, DEFAULT_VOLUME, SUPPORTED_RATES};
pub use track::{parse_duration_seconds, Track};
