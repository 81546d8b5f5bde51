//! deskscan: finds and parses freedesktop desktop entries.
//!
//! - `desktop` parses a single `.desktop` file
//! - `scan` parses every entry in a set of directories concurrently
//! - `dirs` resolves the standard XDG application directories
//! - `executor` turns a parsed entry into a running process

pub mod config;
pub mod desktop;
pub mod dirs;
pub mod error;
pub mod executor;
pub mod model;
pub mod scan;

pub use desktop::{LineBuffer, SectionMode, parse};
pub use error::{ParseError, ScanError};
pub use model::{ActionEntry, Entry, EntryKind, expand_exec};
pub use scan::{ScanOptions, Scanner, scan};
