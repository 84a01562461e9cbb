//! Error handling for statistics loading and guess enumeration.
//!
//! Running out of guesses is not an error: sessions signal it by returning
//! `None` from `Iterator::next`.
use std::fmt;

/// Main error type for all operations.
#[derive(Debug)]
pub enum Error {
    /// The statistics file is missing or unreadable
    Io(std::io::Error),

    /// A record of the statistics file matches neither record shape
    MalformedStatistics(String),

    /// Bounds or model unusable for a session
    InvalidRange(String),

    /// A persisted cursor cannot be decoded or does not fit the model
    Cursor(String),
}

/// Convenience type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::MalformedStatistics(msg) => write!(f, "Malformed statistics: {}", msg),
            Self::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            Self::Cursor(msg) => write!(f, "Cursor error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl Error {
    /// Create a malformed statistics error for a 1-based line number
    pub fn malformed(line_number: usize, msg: impl fmt::Display) -> Self {
        Self::MalformedStatistics(format!("line {}: {}", line_number, msg))
    }

    /// Create an invalid range error
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Create a cursor error
    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::Cursor(msg.into())
    }
}
