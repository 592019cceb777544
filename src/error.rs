//! Error taxonomy for compile and match operations.
//!
//! The surface is deliberately narrow: a call either completes or reports one
//! of these. There is no retry and no partial-failure state; statistics
//! counters reflect whatever work finished before the error.

use std::fmt;
use std::io;

/// Errors returned by the compiler, the index loader, and the matcher.
#[derive(Debug)]
pub enum MatchError {
    /// Caller handed in something unusable (empty pattern, bad thread or
    /// chunk count, pattern that normalises to nothing).
    InvalidArgument(&'static str),
    /// An underlying open/read/write/map operation failed.
    Io(io::Error),
    /// The index file failed validation: wrong magic, wrong version, or
    /// section sizes that do not add up.
    Corrupt(&'static str),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            MatchError::Io(e) => write!(f, "i/o error: {e}"),
            MatchError::Corrupt(msg) => write!(f, "corrupt index: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MatchError {
    fn from(e: io::Error) -> Self {
        MatchError::Io(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MatchError>;
