//! BLF reader
//!
//! Drives the three nested levels of a BLF file: the file header (read once
//! when the reader is created), the stream of file-level log containers, and
//! the objects packed inside each decompressed container. Records are pulled
//! one at a time; the only blocking operation is reading the byte source.
//!
//! Writers cut the object stream into fixed-size containers without regard
//! for object boundaries, so the unread tail of one container is carried over
//! and prepended to the next container's payload.

use super::container::LogContainer;
use super::cursor::ByteCursor;
use super::header::{
    FileHeader, ObjectHeader, ObjectHeaderBase, OBJECT_HEADER_BASE_SIZE, OBJECT_SIGNATURE,
};
use super::objects::{decode_object, ObjectKind, LOG_CONTAINER};
use crate::config::{CompressionPolicy, DecoderConfig};
use crate::formats::LogFileParser;
use crate::types::{DecoderError, Record, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

/// Counters collected while reading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderStats {
    /// Log containers read from the file
    pub containers: u64,
    /// Containers skipped because of an unsupported compression method
    pub containers_skipped: u64,
    /// File-level objects that were not log containers
    pub file_level_objects_skipped: u64,
    /// Total bytes produced by decompression
    pub uncompressed_bytes: u64,
    /// Objects found inside containers, by object type
    pub objects_by_type: BTreeMap<u32, u64>,
    /// Records handed to the caller
    pub records: u64,
    /// Objects that produced no record
    pub objects_skipped: u64,
    /// Records whose timestamp went backwards within a container
    pub out_of_order_timestamps: u64,
}

/// Position in the container/object state machine.
///
/// `NextContainer` covers reading and decompressing a container,
/// `NextObject` covers parsing and decoding one object from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NextContainer,
    NextObject,
    Done,
}

/// Outcome of one attempt to decode an object from the buffer
enum Step {
    Record(Record),
    Skipped,
    /// The buffer ends inside the next object (or holds no more objects)
    NeedMore,
}

/// Lazy, forward-only iterator over the records of a BLF stream
///
/// The first error ends the iteration: corrupted input is never
/// resynchronised by scanning for the next object signature.
pub struct BlfReader<R: Read> {
    source: R,
    header: FileHeader,
    start_time: f64,
    unsupported_compression: CompressionPolicy,
    strict_timestamps: bool,
    state: State,
    /// Bytes consumed from the source so far
    file_offset: u64,
    /// Decompressed objects of the current container, plus any carried tail
    buffer: Vec<u8>,
    pos: usize,
    /// Offset of `buffer[0]` in the uncompressed object stream
    buffer_base: u64,
    /// Padding that may follow the previous object
    pending_padding: usize,
    last_timestamp: Option<f64>,
    warned_types: HashSet<u32>,
    stats: ReaderStats,
}

impl BlfReader<BufReader<File>> {
    /// Open a BLF file with the default configuration
    pub fn open(path: &Path) -> Result<Self> {
        <Self as LogFileParser>::parse(path, &DecoderConfig::default())
    }
}

impl LogFileParser for BlfReader<BufReader<File>> {
    fn parse(path: &Path, config: &DecoderConfig) -> Result<Self> {
        log::info!("Parsing BLF file: {:?}", path);
        let file = File::open(path)?;
        BlfReader::with_config(BufReader::new(file), config)
    }
}

impl<R: Read> BlfReader<R> {
    /// Create a reader with the default configuration.
    ///
    /// Reads and validates the file header immediately, so a bad signature is
    /// reported before any container is touched.
    pub fn new(source: R) -> Result<Self> {
        Self::with_config(source, &DecoderConfig::default())
    }

    pub fn with_config(mut source: R, config: &DecoderConfig) -> Result<Self> {
        let header = FileHeader::read(&mut source)?;
        let (major, minor, build, patch) = header.format_version();
        log::info!(
            "BLF file opened: format {}.{}.{}.{}, {} objects, measurement start {:?}",
            major,
            minor,
            build,
            patch,
            header.object_count,
            header.measurement_start
        );

        Ok(BlfReader {
            source,
            start_time: header.start_timestamp(),
            file_offset: u64::from(header.header_size),
            header,
            unsupported_compression: config.unsupported_compression,
            strict_timestamps: config.strict_timestamps,
            state: State::NextContainer,
            buffer: Vec::new(),
            pos: 0,
            buffer_base: 0,
            pending_padding: 0,
            last_timestamp: None,
            warned_types: HashSet::new(),
            stats: ReaderStats::default(),
        })
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.header
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// Read up to `n` bytes; fewer only at end of input
    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.source).take(n as u64).read_to_end(&mut buf)?;
        self.file_offset += buf.len() as u64;
        Ok(buf)
    }

    /// Read file-level objects until one log container has been decompressed
    /// into the buffer. Returns `false` on a clean end of input.
    fn load_next_container(&mut self) -> Result<bool> {
        loop {
            let object_offset = self.file_offset;
            let base_bytes = self.read_up_to(OBJECT_HEADER_BASE_SIZE)?;
            if base_bytes.is_empty() {
                return Ok(false);
            }
            let base = ObjectHeaderBase::parse(&mut ByteCursor::at_offset(&base_bytes, object_offset))?;

            let rest_len = base.object_size as usize - OBJECT_HEADER_BASE_SIZE;
            let rest = self.read_up_to(rest_len)?;
            if rest.len() < rest_len {
                return Err(DecoderError::OutOfBounds {
                    offset: object_offset + OBJECT_HEADER_BASE_SIZE as u64,
                    needed: rest_len,
                    remaining: rest.len(),
                });
            }
            // The last object of a file may come without its padding
            self.read_up_to(base.padding())?;

            if base.object_type != LOG_CONTAINER {
                log::debug!(
                    "Skipping file-level object type {} at offset {}",
                    base.object_type,
                    object_offset
                );
                self.stats.file_level_objects_skipped += 1;
                continue;
            }

            let body = &rest[base.header_size as usize - OBJECT_HEADER_BASE_SIZE..];
            let container = LogContainer::parse(body, object_offset)?;
            self.stats.containers += 1;

            match container.decompress() {
                Ok(data) => {
                    log::debug!(
                        "Log container #{} at offset {}: {} bytes compressed, {} bytes uncompressed",
                        self.stats.containers,
                        object_offset,
                        container.payload.len(),
                        data.len()
                    );
                    self.append_container_data(data);
                    return Ok(true);
                }
                Err(DecoderError::UnsupportedCompression { method, .. })
                    if self.unsupported_compression == CompressionPolicy::Skip =>
                {
                    log::warn!(
                        "Skipping log container at offset {} with unsupported compression method {}",
                        object_offset,
                        method
                    );
                    self.stats.containers_skipped += 1;
                    self.discard_buffer(container.uncompressed_size);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Replace the consumed part of the buffer with freshly inflated data,
    /// keeping any partial object left over from the previous container
    fn append_container_data(&mut self, data: Vec<u8>) {
        self.stats.uncompressed_bytes += data.len() as u64;
        self.buffer_base += self.pos as u64;

        if self.pos >= self.buffer.len() {
            self.buffer = data;
        } else {
            let mut carried = self.buffer.split_off(self.pos);
            log::trace!("Carrying {} bytes into the next container", carried.len());
            carried.extend_from_slice(&data);
            self.buffer = carried;
        }
        self.pos = 0;
        self.last_timestamp = None;
    }

    /// Drop buffered bytes after a skipped container; an object split across
    /// it can no longer be completed
    fn discard_buffer(&mut self, skipped_len: u32) {
        if self.pos < self.buffer.len() {
            log::warn!(
                "Dropping {} bytes of a partial object before a skipped container",
                self.buffer.len() - self.pos
            );
        }
        self.buffer_base += self.buffer.len() as u64 + u64::from(skipped_len);
        self.buffer.clear();
        self.pos = 0;
        self.pending_padding = 0;
    }

    /// Skip the padding after the previous object, unless the next object
    /// follows immediately. Returns `false` if more bytes are needed to decide.
    fn consume_padding(&mut self) -> bool {
        if self.pending_padding == 0 {
            return true;
        }
        let rest = &self.buffer[self.pos..];
        if rest.len() < OBJECT_SIGNATURE.len() {
            return false;
        }
        if !rest.starts_with(&OBJECT_SIGNATURE) {
            self.pos += self.pending_padding;
        }
        self.pending_padding = 0;
        true
    }

    fn next_object(&mut self) -> Result<Step> {
        if !self.consume_padding() {
            return Ok(Step::NeedMore);
        }

        let offset = self.buffer_base + self.pos as u64;
        let (header, padding, record) = {
            let rest = &self.buffer[self.pos..];
            if rest.len() < OBJECT_HEADER_BASE_SIZE {
                return Ok(Step::NeedMore);
            }
            let base = ObjectHeaderBase::parse(&mut ByteCursor::at_offset(rest, offset))?;
            if rest.len() < base.object_size as usize {
                return Ok(Step::NeedMore);
            }

            let mut cursor = ByteCursor::at_offset(&rest[..base.object_size as usize], offset);
            let header = ObjectHeader::parse(&mut cursor)?;
            log::trace!(
                "Object type {} (v{}, header v{}) at offset {}, {} bytes",
                header.object_type,
                header.object_version,
                header.header_version,
                offset,
                header.object_size
            );
            let record = decode_object(&header, &mut cursor, self.start_time)?;
            (header, base.padding(), record)
        };

        self.pos += header.object_size as usize;
        self.pending_padding = padding;
        *self.stats.objects_by_type.entry(header.object_type).or_insert(0) += 1;

        match record {
            Some(record) => {
                self.check_timestamp(&record, &header, offset)?;
                self.stats.records += 1;
                Ok(Step::Record(record))
            }
            None => {
                self.stats.objects_skipped += 1;
                if let ObjectKind::Unknown(object_type) = ObjectKind::from_type(header.object_type) {
                    if self.warned_types.insert(object_type) {
                        log::warn!(
                            "Skipping unsupported BLF object type {} (size {} bytes)",
                            object_type,
                            header.object_size
                        );
                    }
                }
                Ok(Step::Skipped)
            }
        }
    }

    fn check_timestamp(&mut self, record: &Record, header: &ObjectHeader, offset: u64) -> Result<()> {
        let timestamp = record.timestamp();
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.stats.out_of_order_timestamps += 1;
                if self.strict_timestamps {
                    return Err(DecoderError::MalformedBody {
                        object_type: header.object_type,
                        offset,
                        reason: format!(
                            "timestamp {:.9} precedes previous timestamp {:.9}",
                            timestamp, last
                        ),
                    });
                }
                if self.stats.out_of_order_timestamps == 1 {
                    log::warn!(
                        "Timestamp went backwards at offset {} ({:.9} < {:.9})",
                        offset,
                        timestamp,
                        last
                    );
                }
                return Ok(());
            }
        }
        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    /// Error for bytes left in the buffer when the input ends: a final object
    /// that was cut short
    fn trailing_error(&self) -> Option<DecoderError> {
        let mut rest = &self.buffer[self.pos..];
        let mut offset = self.buffer_base + self.pos as u64;

        // A cut-off signature after unpadded data is the start of an object
        let signature_prefix = !rest.is_empty() && OBJECT_SIGNATURE.starts_with(rest);
        if self.pending_padding > 0 && !rest.starts_with(&OBJECT_SIGNATURE) && !signature_prefix {
            if rest.len() <= self.pending_padding {
                return None;
            }
            rest = &rest[self.pending_padding..];
            offset += self.pending_padding as u64;
        }
        if rest.is_empty() {
            return None;
        }

        let base = match ObjectHeaderBase::parse(&mut ByteCursor::at_offset(rest, offset)) {
            Ok(base) => base,
            Err(e) => return Some(e),
        };
        if rest.len() < base.header_size as usize {
            return Some(DecoderError::TruncatedHeader {
                offset,
                needed: base.header_size as usize,
                available: rest.len(),
            });
        }
        Some(DecoderError::OutOfBounds {
            offset: offset + rest.len() as u64,
            needed: base.object_size as usize - rest.len(),
            remaining: 0,
        })
    }
}

impl<R: Read> Iterator for BlfReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.state {
                State::Done => return None,
                State::NextContainer => match self.load_next_container() {
                    Ok(true) => {
                        self.state = State::NextObject;
                        continue;
                    }
                    Ok(false) => {
                        self.state = State::Done;
                        log::debug!("End of BLF input after {} containers", self.stats.containers);
                        return self.trailing_error().map(Err);
                    }
                    Err(e) => Err(e),
                },
                State::NextObject => self.next_object(),
            };

            match step {
                Ok(Step::Record(record)) => return Some(Ok(record)),
                Ok(Step::Skipped) => {}
                Ok(Step::NeedMore) => self.state = State::NextContainer,
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: Read> FusedIterator for BlfReader<R> {}
