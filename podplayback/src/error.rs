//! Error types for playback sessions

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum Error {
    /// The audio backend rejected an operation
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// The backend accepted the media but playback never became audible
    #[error("Playback failed to start: {0}")]
    StartFailed(String),

    /// Rate outside the supported set
    #[error("Unsupported playback rate: {0}")]
    UnsupportedRate(f64),

    /// Rate changes only apply to an actively playing session
    #[error("Playback rate can only be changed while playing")]
    NotPlaying,

    /// The current media does not support seeking
    #[error("Current media is not seekable")]
    NotSeekable,
}

impl Error {
    /// Build a backend error from any displayable cause
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Error::Backend(message.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, Error>;
