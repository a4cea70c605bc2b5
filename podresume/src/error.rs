//! Error types for the resume store

/// Result type alias for resume store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while persisting the resume store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
