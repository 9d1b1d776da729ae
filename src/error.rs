//! Crate-wide error type.
//!
//! Matches the taxonomy of spec §7: I/O failure, alignment failure, invalid
//! command, and domain error are all represented here. Logical misses (key
//! not found, empty scan) are deliberately *not* part of this enum — they
//! are typed results (`crate::core::Lookup`), never errors.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Open/read/write/unlink failure against the filesystem.
    Io(io::Error),
    /// Aligned-buffer allocation failure; treated as an I/O failure (§7).
    Alignment(String),
    /// A line at the interactive surface didn't match any known command.
    InvalidCommand(String),
    /// An operation was invoked outside its supported domain (no open
    /// database, a negative key, an empty level, ...).
    Domain(String),
    /// On-disk data failed a structural sanity check (bad page count,
    /// unexpected file length, ...).
    Corrupt(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O failure: {err}"),
            Error::Alignment(msg) => write!(f, "alignment failure: {msg}"),
            Error::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Error::Domain(msg) => write!(f, "domain error: {msg}"),
            Error::Corrupt(msg) => write!(f, "corrupt on-disk data: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
