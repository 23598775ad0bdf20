use std::fmt;

/// Errors surfaced by the public, recoverable operations of the library.
///
/// Hard invariant violations (a corrupt compressed block, a pool-count overflow) are not
/// represented here: those are modelled as `panic!`s at the point of detection, matching the
/// "no partial commits, no recovery beyond single-query granularity" policy of the core.
#[derive(Debug)]
pub enum ZambeziError {
    /// A line of input or a query could not be parsed.
    MalformedInput(String),
    /// An index file or companion file is missing, truncated, or has an unexpected header.
    CorruptIndex(String),
    /// An I/O operation failed while reading or writing a file.
    Io(std::io::Error),
    /// A CLI argument was missing, malformed, or named an unknown algorithm.
    UsageError(String),
    /// The segment pool arena ran out of room. Always fatal: constructed only to format a
    /// panic message, never returned as a `Result` (no recovery path exists once every pool
    /// is full).
    PoolsExhausted(String),
}

impl fmt::Display for ZambeziError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZambeziError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            ZambeziError::CorruptIndex(msg) => write!(f, "corrupt index: {msg}"),
            ZambeziError::Io(err) => write!(f, "I/O error: {err}"),
            ZambeziError::UsageError(msg) => write!(f, "usage error: {msg}"),
            ZambeziError::PoolsExhausted(msg) => write!(f, "segment pool exhausted: {msg}"),
        }
    }
}

impl std::error::Error for ZambeziError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZambeziError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ZambeziError {
    fn from(err: std::io::Error) -> Self {
        ZambeziError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, ZambeziError>;
