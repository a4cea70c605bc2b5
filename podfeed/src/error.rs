//! Error types for feed retrieval and parsing

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or parsing a feed
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL failed the syntactic validity check
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed server answered with a non-success status
    #[error("Feed server returned HTTP {0}")]
    Status(u16),

    /// Feed document could not be parsed as RSS
    #[error("Feed parsing failed: {0}")]
    Parse(String),

    /// Feed parsed fine but yielded no playable episodes
    #[error("No valid episodes found in feed")]
    NoEpisodes,

    /// Fetch was cancelled by a newer request
    #[error("Fetch cancelled")]
    Cancelled,
}

impl Error {
    /// Create a parse error from a string
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether this outcome is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the failure is worth retrying (network trouble or 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => (500..600).contains(code),
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
