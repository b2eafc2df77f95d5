//! Log file format parsers
//!
//! Each parser is an iterator over decoded records.

use crate::config::DecoderConfig;
use crate::types::{Record, Result};
use std::path::Path;

pub mod blf;

pub use blf::{BlfReader, FileHeader, ReaderStats};

/// Common trait for log file parsers
pub trait LogFileParser: Iterator<Item = Result<Record>> + Sized {
    /// Open a log file and return an iterator over its records
    fn parse(path: &Path, config: &DecoderConfig) -> Result<Self>;
}
