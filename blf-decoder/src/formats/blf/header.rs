//! BLF file header and object header parsing
//!
//! ## File header ("file statistics")
//! The file opens with the `LOGG` signature followed by the declared header
//! size (normally 144). Fields beyond the fixed part are only present in the
//! larger layouts; anything past the fields we interpret is reserved and
//! skipped.
//!
//! ## Object header
//! Every object starts with a 16 byte base header (`LOBJ`, header size,
//! header version, object size, object type). Version 1 appends flags, client
//! index, object version and timestamp (32 bytes total); version 2 adds a
//! timestamp status byte and the original timestamp (40 bytes total).
//! Log containers carry the base header only.

use super::cursor::ByteCursor;
use crate::types::{DecoderError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::Read;

pub const FILE_SIGNATURE: [u8; 4] = *b"LOGG";
pub const OBJECT_SIGNATURE: [u8; 4] = *b"LOBJ";

/// Signature, header size, API number, application info, sizes, counts
const FILE_HEADER_FIXED_SIZE: usize = 40;
/// Fixed part plus measurement start and last object time
const FILE_HEADER_WITH_TIMES_SIZE: usize = FILE_HEADER_FIXED_SIZE + 32;

pub const OBJECT_HEADER_BASE_SIZE: usize = 16;
pub const OBJECT_HEADER_V1_SIZE: usize = OBJECT_HEADER_BASE_SIZE + 16;
pub const OBJECT_HEADER_V2_SIZE: usize = OBJECT_HEADER_BASE_SIZE + 24;

/// Object timestamp in 10 µs ticks; any other flag value means 1 ns ticks
pub const TIME_TEN_MICS: u32 = 0x0000_0001;

/// Parsed BLF file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Declared size of the header in bytes
    pub header_size: u32,
    /// Binlog API number, e.g. 4070100 for 4.7.1.0
    pub api_version: u32,
    pub application_id: u8,
    pub compression_level: u8,
    /// Major and minor version of the writing application
    pub application_version: (u8, u8),
    pub file_size: u64,
    pub uncompressed_size: u64,
    pub object_count: u32,
    pub application_build: u32,
    pub measurement_start: Option<NaiveDateTime>,
    pub measurement_stop: Option<NaiveDateTime>,
}

impl FileHeader {
    /// Read and validate the file header from the start of a BLF stream.
    ///
    /// Consumes exactly `header_size` bytes, so the stream is left at the first
    /// file-level object. The signature is checked before anything else is
    /// interpreted.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut prefix = Vec::with_capacity(8);
        reader.by_ref().take(8).read_to_end(&mut prefix)?;

        let available = prefix.len().min(FILE_SIGNATURE.len());
        if prefix[..available] != FILE_SIGNATURE[..available] {
            let mut found = [0u8; 4];
            found[..available].copy_from_slice(&prefix[..available]);
            return Err(DecoderError::InvalidSignature { found });
        }
        if prefix.len() < 8 {
            return Err(DecoderError::TruncatedHeader {
                offset: 0,
                needed: FILE_HEADER_FIXED_SIZE,
                available: prefix.len(),
            });
        }

        let mut cursor = ByteCursor::new(&prefix);
        cursor.skip(4)?;
        let header_size = cursor.read_u32()?;
        if (header_size as usize) < FILE_HEADER_FIXED_SIZE {
            return Err(DecoderError::TruncatedHeader {
                offset: 4,
                needed: FILE_HEADER_FIXED_SIZE,
                available: header_size as usize,
            });
        }

        let mut rest = Vec::new();
        reader
            .by_ref()
            .take(header_size as u64 - 8)
            .read_to_end(&mut rest)?;
        if rest.len() < header_size as usize - 8 {
            return Err(DecoderError::TruncatedHeader {
                offset: 0,
                needed: header_size as usize,
                available: rest.len() + 8,
            });
        }

        let mut cursor = ByteCursor::at_offset(&rest, 8);
        let api_version = cursor.read_u32()?;
        let application_id = cursor.read_u8()?;
        let compression_level = cursor.read_u8()?;
        let application_version = (cursor.read_u8()?, cursor.read_u8()?);
        let file_size = cursor.read_u64()?;
        let uncompressed_size = cursor.read_u64()?;
        let object_count = cursor.read_u32()?;
        let application_build = cursor.read_u32()?;

        let (measurement_start, measurement_stop) =
            if header_size as usize >= FILE_HEADER_WITH_TIMES_SIZE {
                (
                    systemtime_to_datetime(&read_systemtime(&mut cursor)?),
                    systemtime_to_datetime(&read_systemtime(&mut cursor)?),
                )
            } else {
                (None, None)
            };

        let header = FileHeader {
            header_size,
            api_version,
            application_id,
            compression_level,
            application_version,
            file_size,
            uncompressed_size,
            object_count,
            application_build,
            measurement_start,
            measurement_stop,
        };
        log::debug!("BLF file header: {:?}", header);
        Ok(header)
    }

    /// Binlog format version as (major, minor, build, patch)
    pub fn format_version(&self) -> (u32, u32, u32, u32) {
        let v = self.api_version;
        (v / 1_000_000, (v / 10_000) % 100, (v / 100) % 100, v % 100)
    }

    pub fn is_compressed(&self) -> bool {
        self.file_size != self.uncompressed_size
    }

    /// Measurement start as seconds since the Unix epoch (0.0 when the header
    /// carries no valid start time). The logger's wall clock is taken as UTC.
    pub fn start_timestamp(&self) -> f64 {
        self.measurement_start
            .map(|dt| {
                let utc = dt.and_utc();
                utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9
            })
            .unwrap_or(0.0)
    }
}

/// Windows SYSTEMTIME: year, month, day of week, day, hour, minute, second, ms
fn read_systemtime(cursor: &mut ByteCursor<'_>) -> Result<[u16; 8]> {
    let mut st = [0u16; 8];
    for field in st.iter_mut() {
        *field = cursor.read_u16()?;
    }
    Ok(st)
}

fn systemtime_to_datetime(st: &[u16; 8]) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(i32::from(st[0]), u32::from(st[1]), u32::from(st[3])).and_then(|d| {
        d.and_hms_milli_opt(
            u32::from(st[4]),
            u32::from(st[5]),
            u32::from(st[6]),
            u32::from(st[7]),
        )
    })
}

/// The 16 byte prefix shared by every object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeaderBase {
    pub header_size: u16,
    pub header_version: u16,
    pub object_size: u32,
    pub object_type: u32,
}

impl ObjectHeaderBase {
    /// Parse the base header at the cursor.
    ///
    /// Checks the signature, that the header size covers at least the base
    /// and that the object is at least as large as its header.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let start = cursor.offset();
        if cursor.remaining() < OBJECT_HEADER_BASE_SIZE {
            return Err(DecoderError::TruncatedHeader {
                offset: start,
                needed: OBJECT_HEADER_BASE_SIZE,
                available: cursor.remaining(),
            });
        }

        let signature: [u8; 4] = cursor.read_array()?;
        if signature != OBJECT_SIGNATURE {
            return Err(DecoderError::InvalidObjectSignature {
                offset: start,
                found: signature,
            });
        }

        let base = ObjectHeaderBase {
            header_size: cursor.read_u16()?,
            header_version: cursor.read_u16()?,
            object_size: cursor.read_u32()?,
            object_type: cursor.read_u32()?,
        };

        if (base.header_size as usize) < OBJECT_HEADER_BASE_SIZE {
            return Err(DecoderError::MalformedBody {
                object_type: base.object_type,
                offset: start,
                reason: format!("header size {} below base header size", base.header_size),
            });
        }
        if base.object_size < u32::from(base.header_size) {
            return Err(DecoderError::MalformedBody {
                object_type: base.object_type,
                offset: start,
                reason: format!(
                    "object size {} smaller than header size {}",
                    base.object_size, base.header_size
                ),
            });
        }
        Ok(base)
    }

    /// Padding the writer appends after an object of this size
    pub fn padding(&self) -> usize {
        (self.object_size % 4) as usize
    }
}

/// Full object header: base plus the version-specific extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub header_size: u16,
    pub header_version: u16,
    pub object_size: u32,
    pub object_type: u32,
    pub flags: u32,
    pub object_version: u16,
    /// Raw timestamp in the unit selected by `flags`
    pub timestamp: u64,
}

impl ObjectHeader {
    /// Parse an object header and leave the cursor at the body.
    ///
    /// The cursor always ends at `header_start + header_size`, whatever
    /// reserved fields the header carries beyond the ones read here.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let header_start = cursor.position();
        let start_offset = cursor.offset();
        let base = ObjectHeaderBase::parse(cursor)?;

        let required = match base.header_version {
            1 => OBJECT_HEADER_V1_SIZE,
            2 => OBJECT_HEADER_V2_SIZE,
            version => {
                return Err(DecoderError::UnknownHeaderVersion {
                    offset: start_offset,
                    version,
                })
            }
        };

        let header_size = base.header_size as usize;
        if cursor.remaining() + OBJECT_HEADER_BASE_SIZE < header_size {
            return Err(DecoderError::TruncatedHeader {
                offset: start_offset,
                needed: header_size,
                available: cursor.remaining() + OBJECT_HEADER_BASE_SIZE,
            });
        }

        let mut header = ObjectHeader {
            header_size: base.header_size,
            header_version: base.header_version,
            object_size: base.object_size,
            object_type: base.object_type,
            flags: 0,
            object_version: 0,
            timestamp: 0,
        };

        // Base-only headers (log containers) have no timestamp part
        if header_size > OBJECT_HEADER_BASE_SIZE {
            if header_size < required {
                return Err(DecoderError::TruncatedHeader {
                    offset: start_offset,
                    needed: required,
                    available: header_size,
                });
            }
            header.flags = cursor.read_u32()?;
            if base.header_version == 1 {
                let _client_index = cursor.read_u16()?;
                header.object_version = cursor.read_u16()?;
                header.timestamp = cursor.read_u64()?;
            } else {
                let _timestamp_status = cursor.read_u8()?;
                let _reserved = cursor.read_u8()?;
                header.object_version = cursor.read_u16()?;
                header.timestamp = cursor.read_u64()?;
                let _original_timestamp = cursor.read_u64()?;
            }
        }

        cursor.seek(header_start + header_size)?;
        Ok(header)
    }

    /// Object timestamp in seconds relative to measurement start
    pub fn timestamp_seconds(&self) -> f64 {
        let factor = if self.flags == TIME_TEN_MICS { 1e-5 } else { 1e-9 };
        self.timestamp as f64 * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIME_ONE_NANS: u32 = 0x0000_0002;

    fn object_header_bytes(version: u16, header_size: u16, object_size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"LOBJ");
        buf.extend_from_slice(&header_size.to_le_bytes());
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&object_size.to_le_bytes());
        buf.extend_from_slice(&86u32.to_le_bytes());
        buf.extend_from_slice(&TIME_ONE_NANS.to_le_bytes());
        if version == 1 {
            buf.extend_from_slice(&0u16.to_le_bytes());
            buf.extend_from_slice(&3u16.to_le_bytes());
            buf.extend_from_slice(&1_500_000_000u64.to_le_bytes());
        } else {
            buf.push(0);
            buf.push(0);
            buf.extend_from_slice(&3u16.to_le_bytes());
            buf.extend_from_slice(&1_500_000_000u64.to_le_bytes());
            buf.extend_from_slice(&0u64.to_le_bytes());
        }
        buf
    }

    fn file_header_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"LOGG");
        buf.extend_from_slice(&144u32.to_le_bytes());
        buf.extend_from_slice(&4_070_100u32.to_le_bytes());
        buf.extend_from_slice(&[5, 6, 2, 3]);
        buf.extend_from_slice(&420u64.to_le_bytes());
        buf.extend_from_slice(&420u64.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for v in [2024u16, 4, 5, 26, 18, 52, 20, 500] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in [2024u16, 4, 5, 26, 18, 53, 0, 0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.resize(144, 0);
        buf
    }

    #[test]
    fn test_file_header() {
        let mut bytes = file_header_bytes();
        bytes.extend_from_slice(b"LOBJ");
        let mut reader = std::io::Cursor::new(bytes);
        let header = FileHeader::read(&mut reader).unwrap();

        assert_eq!(reader.position(), 144);
        assert_eq!(header.header_size, 144);
        assert_eq!(header.format_version(), (4, 7, 1, 0));
        assert_eq!(header.application_id, 5);
        assert_eq!(header.application_version, (2, 3));
        assert_eq!(header.object_count, 4);
        assert!(!header.is_compressed());

        let start = header.measurement_start.unwrap();
        assert_eq!(start.to_string(), "2024-04-26 18:52:20.500");
        assert!(header.measurement_stop.is_some());
        assert!((header.start_timestamp() - 1_714_157_540.5).abs() < 1e-6);
    }

    #[test]
    fn test_file_header_bad_signature() {
        let mut bytes = file_header_bytes();
        bytes[0] = b'X';
        let err = FileHeader::read(&mut std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidSignature { found } if &found == b"XOGG"));
    }

    #[test]
    fn test_file_header_truncated() {
        let bytes = file_header_bytes();
        let err = FileHeader::read(&mut std::io::Cursor::new(&bytes[..100])).unwrap_err();
        assert!(matches!(err, DecoderError::TruncatedHeader { needed: 144, .. }));

        let err = FileHeader::read(&mut std::io::Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, DecoderError::TruncatedHeader { available: 0, .. }));
    }

    #[test]
    fn test_short_file_with_wrong_signature() {
        let err = FileHeader::read(&mut std::io::Cursor::new(b"LX".to_vec())).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidSignature { found } if &found == b"LX\0\0"));

        let err = FileHeader::read(&mut std::io::Cursor::new(b"LOG".to_vec())).unwrap_err();
        assert!(matches!(err, DecoderError::TruncatedHeader { available: 3, .. }));
    }

    #[test]
    fn test_huge_header_size_is_truncated() {
        let mut bytes = file_header_bytes();
        bytes[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = FileHeader::read(&mut std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            DecoderError::TruncatedHeader { needed, available: 144, .. } if needed == u32::MAX as usize
        ));
    }

    #[test]
    fn test_zero_systemtime_has_no_start() {
        let mut bytes = file_header_bytes();
        for b in &mut bytes[40..72] {
            *b = 0;
        }
        let header = FileHeader::read(&mut std::io::Cursor::new(bytes)).unwrap();
        assert!(header.measurement_start.is_none());
        assert_eq!(header.start_timestamp(), 0.0);
    }

    #[test]
    fn test_object_header_v1() {
        let bytes = object_header_bytes(1, 32, 48);
        let mut cursor = ByteCursor::new(&bytes);
        let header = ObjectHeader::parse(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 32);
        assert_eq!(header.object_type, 86);
        assert_eq!(header.object_version, 3);
        assert_eq!(header.object_size - u32::from(header.header_size), 16);
        assert!((header.timestamp_seconds() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_object_header_v2_with_trailing_reserved_bytes() {
        let mut bytes = object_header_bytes(2, 44, 60);
        bytes.extend_from_slice(&[0xEE; 4]);
        bytes.push(0x99);
        let mut cursor = ByteCursor::new(&bytes);
        let header = ObjectHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.header_version, 2);
        assert_eq!(cursor.position(), 44);
        assert_eq!(cursor.read_u8().unwrap(), 0x99);
    }

    #[test]
    fn test_ten_microsecond_ticks() {
        let mut bytes = object_header_bytes(1, 32, 32);
        bytes[16..20].copy_from_slice(&TIME_TEN_MICS.to_le_bytes());
        let header = ObjectHeader::parse(&mut ByteCursor::new(&bytes)).unwrap();
        assert!((header.timestamp_seconds() - 15_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_object_header_errors() {
        let bytes = object_header_bytes(1, 32, 48);
        let err = ObjectHeader::parse(&mut ByteCursor::new(&bytes[..10])).unwrap_err();
        assert!(matches!(err, DecoderError::TruncatedHeader { needed: 16, available: 10, .. }));

        let err = ObjectHeader::parse(&mut ByteCursor::new(&bytes[..20])).unwrap_err();
        assert!(matches!(err, DecoderError::TruncatedHeader { needed: 32, .. }));

        let bytes = object_header_bytes(3, 32, 48);
        let err = ObjectHeader::parse(&mut ByteCursor::at_offset(&bytes, 200)).unwrap_err();
        assert!(matches!(err, DecoderError::UnknownHeaderVersion { offset: 200, version: 3 }));

        let mut bytes = object_header_bytes(1, 32, 48);
        bytes[0] = b'X';
        let err = ObjectHeader::parse(&mut ByteCursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidObjectSignature { offset: 0, .. }));

        let bytes = object_header_bytes(1, 32, 20);
        let err = ObjectHeader::parse(&mut ByteCursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, DecoderError::MalformedBody { object_type: 86, .. }));
    }
}
