//! Error type shared across the crate.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent configuration; the message names the
    /// offending token.
    #[error("configuration error: {0}")]
    Config(String),
    /// A programming mistake was detected at run time, for example a channel
    /// draw against a vanishing total rate.
    #[error("logic error: {0}")]
    Logic(String),
    /// Reading or writing the interpolation-table cache failed.
    #[error("table cache error: {0}")]
    Tables(String),
    /// Forwarded I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias with the crate error type.
pub type Result<T> = std::result::Result<T, Error>;
