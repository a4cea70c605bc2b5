//! Audio backend abstraction
//!
//! The session drives playback through this trait so the state machine can
//! be exercised against a scripted backend in tests and a real media stack
//! in production. Implementations wrap their own handle internally; all
//! methods take `&self` and must be safe to call from the session's worker
//! tasks.

use crate::error::Result;

/// Minimal control surface over an audio player
///
/// Object safe so sessions can hold `Arc<dyn MediaBackend>`. Accessors that
/// can fail mid-stream return `Result`; cheap state probes return plain
/// values.
pub trait MediaBackend: Send + Sync {
    /// Load a media URL, replacing whatever was loaded before
    fn open(&self, url: &str) -> Result<()>;

    /// Start or resume playback of the loaded media
    fn play(&self) -> Result<()>;

    /// Pause playback, keeping the media loaded
    fn pause(&self) -> Result<()>;

    /// Stop playback and release the loaded media
    fn stop(&self) -> Result<()>;

    /// Set output volume in [0.0, 1.0]
    fn set_volume(&self, volume: f64) -> Result<()>;

    /// Set the playback rate multiplier
    fn set_rate(&self, rate: f64) -> Result<()>;

    /// Seek to an absolute position in seconds
    fn seek(&self, position_seconds: u64) -> Result<()>;

    /// Whether media is audibly playing right now
    fn is_playing(&self) -> bool;

    /// Whether the loaded media supports seeking
    fn is_seekable(&self) -> bool;

    /// Current playback position in seconds
    fn position_seconds(&self) -> Result<u64>;

    /// Duration of the loaded media in seconds, 0 when unknown
    fn duration_seconds(&self) -> Result<u64>;
}
