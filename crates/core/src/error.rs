//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("archive format error: {0}")]
    Format(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid hostname: {0}")]
    InvalidHostname(String),
}

impl Error {
    /// Whether this error came from decoding caller-supplied archive bytes.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::InvalidPath(_))
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
