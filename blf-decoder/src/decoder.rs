//! Main decoder API
//!
//! [`Decoder`] is the entry point for decoding log files. It opens the
//! underlying format reader and applies the channel and arbitration-ID
//! filters from [`DecoderConfig`] to the record stream.

use crate::config::DecoderConfig;
use crate::formats::{BlfReader, FileHeader, LogFileParser, ReaderStats};
use crate::types::{DecoderError, Record, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a log file and return an iterator of records
    ///
    /// The file header is read before this returns, so a file that is not a
    /// BLF file fails here rather than on the first record.
    ///
    /// # Example
    /// ```no_run
    /// use blf_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// for record in decoder.decode_file(Path::new("trace.blf")).unwrap() {
    ///     match record {
    ///         Ok(record) => println!("{:?}", record),
    ///         Err(e) => eprintln!("Error: {}", e),
    ///     }
    /// }
    /// ```
    pub fn decode_file(&self, path: &Path) -> Result<Records<BufReader<File>>> {
        log::info!("Decoding log file: {:?}", path);

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("blf") => {
                let reader = BlfReader::parse(path, &self.config)?;
                Ok(Records::new(reader, self.config.clone()))
            }
            _ => Err(DecoderError::UnsupportedFormat(format!(
                "expected a .blf file, got {:?}",
                path
            ))),
        }
    }

    /// Decode BLF data from any byte source
    pub fn decode_reader<R: Read>(&self, source: R) -> Result<Records<R>> {
        let reader = BlfReader::with_config(source, &self.config)?;
        Ok(Records::new(reader, self.config.clone()))
    }
}

/// Filtered record iterator returned by [`Decoder`]
///
/// Errors are never filtered; the first error ends the stream.
pub struct Records<R: Read> {
    reader: BlfReader<R>,
    config: DecoderConfig,
    filtered: u64,
}

impl<R: Read> Records<R> {
    fn new(reader: BlfReader<R>, config: DecoderConfig) -> Self {
        Self {
            reader,
            config,
            filtered: 0,
        }
    }

    pub fn file_header(&self) -> &FileHeader {
        self.reader.file_header()
    }

    pub fn stats(&self) -> &ReaderStats {
        self.reader.stats()
    }

    /// Number of records dropped by the channel and ID filters
    pub fn filtered(&self) -> u64 {
        self.filtered
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.next()? {
                Ok(record) => {
                    if self
                        .config
                        .should_process_record(record.channel(), record.arbitration_id())
                    {
                        return Some(Ok(record));
                    }
                    self.filtered += 1;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
