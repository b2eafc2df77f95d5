//! Core types for the BLF decoder library
//!
//! This module defines the records the decoder emits while walking a BLF file
//! and the error taxonomy shared by every layer of the codec. Records are
//! owned values: none of them borrows from the reader's container buffers, so
//! they can outlive the reader and move freely between threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used for wall-clock conversions
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Largest standard (11-bit) arbitration ID
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Largest extended (29-bit) arbitration ID
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Payload byte count for each CAN-FD DLC value
const FD_DLC_LENGTHS: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Map a data length code to its payload byte count.
///
/// DLC 0–8 map to themselves, 9–15 follow the CAN-FD table.
/// Returns `None` for values that do not fit in four bits.
pub fn dlc_to_byte_length(dlc: u8) -> Option<usize> {
    FD_DLC_LENGTHS.get(dlc as usize).copied()
}

/// Frame direction as recorded by the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Rx,
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "Rx"),
            Direction::Tx => write!(f, "Tx"),
        }
    }
}

/// Classic CAN data frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanMessage {
    /// Absolute timestamp in seconds (measurement start + object timestamp)
    pub timestamp: f64,
    /// Zero-based channel number
    pub channel: u16,
    /// 11-bit or 29-bit identifier
    pub arbitration_id: u32,
    pub is_extended_id: bool,
    pub direction: Direction,
    /// Data length code, 0–8
    pub dlc: u8,
    /// Payload, exactly `dlc` bytes
    pub data: Vec<u8>,
}

/// CAN-FD data frame (extended data length bit set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanFdMessage {
    /// Absolute timestamp in seconds
    pub timestamp: f64,
    /// Zero-based channel number
    pub channel: u16,
    pub arbitration_id: u32,
    pub is_extended_id: bool,
    pub direction: Direction,
    /// Bit rate switch
    pub bitrate_switch: bool,
    /// Error state indicator
    pub error_state_indicator: bool,
    /// Data length code, 0–15
    pub dlc: u8,
    /// Payload, `dlc_to_byte_length(dlc)` bytes
    pub data: Vec<u8>,
}

/// Remote transmission request. Carries the requested DLC but no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFrame {
    pub timestamp: f64,
    pub channel: u16,
    pub arbitration_id: u32,
    pub is_extended_id: bool,
    pub direction: Direction,
    pub dlc: u8,
}

/// Error frame observed on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub timestamp: f64,
    pub channel: u16,
    /// Error code captured by the CAN controller (ECC register), when the
    /// logger stored one
    pub diagnostic_code: Option<u8>,
}

/// A decoded BLF record
///
/// Every variant declares its own field set; the accessors below expose the
/// common columns a row-oriented writer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    Can(CanMessage),
    CanFd(CanFdMessage),
    Remote(RemoteFrame),
    Error(ErrorFrame),
}

impl Record {
    /// Absolute timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        match self {
            Record::Can(m) => m.timestamp,
            Record::CanFd(m) => m.timestamp,
            Record::Remote(m) => m.timestamp,
            Record::Error(m) => m.timestamp,
        }
    }

    /// Timestamp as UTC date-time, if representable
    pub fn datetime(&self) -> Option<Timestamp> {
        let ts = self.timestamp();
        let secs = ts.floor();
        let nanos = ((ts - secs) * 1e9).round() as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }

    /// Zero-based channel number
    pub fn channel(&self) -> u16 {
        match self {
            Record::Can(m) => m.channel,
            Record::CanFd(m) => m.channel,
            Record::Remote(m) => m.channel,
            Record::Error(m) => m.channel,
        }
    }

    /// Arbitration ID; error frames carry none
    pub fn arbitration_id(&self) -> Option<u32> {
        match self {
            Record::Can(m) => Some(m.arbitration_id),
            Record::CanFd(m) => Some(m.arbitration_id),
            Record::Remote(m) => Some(m.arbitration_id),
            Record::Error(_) => None,
        }
    }

    pub fn is_extended_id(&self) -> bool {
        match self {
            Record::Can(m) => m.is_extended_id,
            Record::CanFd(m) => m.is_extended_id,
            Record::Remote(m) => m.is_extended_id,
            Record::Error(_) => false,
        }
    }

    pub fn is_remote_frame(&self) -> bool {
        matches!(self, Record::Remote(_))
    }

    pub fn is_error_frame(&self) -> bool {
        matches!(self, Record::Error(_))
    }

    pub fn is_fd(&self) -> bool {
        matches!(self, Record::CanFd(_))
    }

    /// Raw data length code (0 for error frames)
    pub fn dlc(&self) -> u8 {
        match self {
            Record::Can(m) => m.dlc,
            Record::CanFd(m) => m.dlc,
            Record::Remote(m) => m.dlc,
            Record::Error(_) => 0,
        }
    }

    /// Payload bytes; empty for remote and error frames
    pub fn data(&self) -> &[u8] {
        match self {
            Record::Can(m) => &m.data,
            Record::CanFd(m) => &m.data,
            Record::Remote(_) | Record::Error(_) => &[],
        }
    }
}

/// Errors that can occur during decoding
///
/// Structural variants carry the byte offset where decoding failed. For file
/// and container level errors this is the offset in the file; for object
/// level errors it is the offset in the uncompressed object stream (the
/// concatenation of all decompressed container payloads).
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("read past end of buffer at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    OutOfBounds {
        offset: u64,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid BLF file signature {found:?} (expected \"LOGG\")")]
    InvalidSignature { found: [u8; 4] },

    #[error("invalid BLF object signature {found:?} at offset {offset} (expected \"LOBJ\")")]
    InvalidObjectSignature { offset: u64, found: [u8; 4] },

    #[error("truncated header at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedHeader {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("unknown object header version {version} at offset {offset}")]
    UnknownHeaderVersion { offset: u64, version: u16 },

    #[error("corrupt log container at offset {offset}: {reason}")]
    CorruptContainer { offset: u64, reason: String },

    #[error("unsupported compression method {method} in log container at offset {offset}")]
    UnsupportedCompression { offset: u64, method: u16 },

    #[error("malformed body of object type {object_type} at offset {offset}: {reason}")]
    MalformedBody {
        object_type: u32,
        offset: u64,
        reason: String,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecoderError {
    /// Byte offset the error refers to, if any
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecoderError::OutOfBounds { offset, .. }
            | DecoderError::InvalidObjectSignature { offset, .. }
            | DecoderError::TruncatedHeader { offset, .. }
            | DecoderError::UnknownHeaderVersion { offset, .. }
            | DecoderError::CorruptContainer { offset, .. }
            | DecoderError::UnsupportedCompression { offset, .. }
            | DecoderError::MalformedBody { offset, .. } => Some(*offset),
            DecoderError::InvalidSignature { .. } => Some(0),
            DecoderError::UnsupportedFormat(_) | DecoderError::IoError(_) => None,
        }
    }

    /// Short name of the error kind, for reporting
    pub fn kind(&self) -> &'static str {
        match self {
            DecoderError::OutOfBounds { .. } => "OutOfBounds",
            DecoderError::InvalidSignature { .. } => "InvalidSignature",
            DecoderError::InvalidObjectSignature { .. } => "InvalidObjectSignature",
            DecoderError::TruncatedHeader { .. } => "TruncatedHeader",
            DecoderError::UnknownHeaderVersion { .. } => "UnknownHeaderVersion",
            DecoderError::CorruptContainer { .. } => "CorruptContainer",
            DecoderError::UnsupportedCompression { .. } => "UnsupportedCompression",
            DecoderError::MalformedBody { .. } => "MalformedBody",
            DecoderError::UnsupportedFormat(_) => "UnsupportedFormat",
            DecoderError::IoError(_) => "Io",
        }
    }
}
