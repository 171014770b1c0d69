//! Error taxonomy
//!
//! Every failure in the core is recoverable: malformed level data and write
//! failures are surfaced to the caller, degenerate strokes are discarded by
//! the gesture layer. Nothing here aborts the process.

use std::fmt;
use std::io;

/// Errors surfaced by the scene and level layers
#[derive(Debug)]
pub enum Error {
    /// Malformed or missing level data; the previous scene state is preserved
    Load(String),
    /// A save/write failure; the simulation is unaffected
    Io(io::Error),
    /// A stroke too degenerate to simulate (fewer than 2 distinct points)
    InvalidGeometry,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Load(msg) => write!(f, "level load failed: {}", msg),
            Error::Io(err) => write!(f, "write failed: {}", err),
            Error::InvalidGeometry => write!(f, "stroke has fewer than 2 distinct points"),
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
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Load(err.to_string())
    }
}
