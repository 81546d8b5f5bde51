//! Error types for deskscan
//!
//! Parsing a single descriptor can fail in two ways (no main header, or the
//! read itself failed). The scan promotes every per-file and per-directory
//! failure to a single fatal `ScanError`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub(crate) const SECTION_HEADER_NOT_FOUND: &str = "section header not found";

/// Failure to parse one desktop entry
#[derive(Error, Debug)]
pub enum ParseError {
    /// The main `[Desktop Entry]` header was missing or not first
    #[error("failed to parse desktop entry: {reason}")]
    Format { reason: &'static str },

    /// The underlying stream failed, or a line overflowed the line buffer
    #[error("failed to parse desktop entry: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    pub(crate) fn header_not_found() -> Self {
        ParseError::Format {
            reason: SECTION_HEADER_NOT_FOUND,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(source: io::Error) -> Self {
        ParseError::Read { source }
    }
}

/// First fatal failure of a directory scan
#[derive(Error, Debug)]
pub enum ScanError {
    /// A directory could not be listed for a reason other than not existing
    #[error("failed to list '{dir}': {source}")]
    List {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A candidate file could not be opened for a reason other than not existing
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A candidate file was not a usable desktop entry
    #[error("'{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A listing or worker thread could not be started
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
