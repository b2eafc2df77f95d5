//! Log container parsing and decompression
//!
//! Objects in a BLF file are packed into log containers (object type 10).
//! The container body is a 16 byte header (compression method, reserved,
//! uncompressed size, reserved) followed by the payload, either raw or a
//! zlib stream. Each container is inflated on its own; no dictionary or
//! state carries over from one container to the next.

use super::cursor::ByteCursor;
use crate::types::{DecoderError, Result};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Size of the container header inside the object body
pub const LOG_CONTAINER_HEADER_SIZE: usize = 16;

/// Compression applied to a container payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMethod {
    None,
    Zlib,
}

impl CompressionMethod {
    pub const NONE: u16 = 0;
    pub const ZLIB_DEFLATE: u16 = 2;

    pub fn from_raw(method: u16) -> Option<Self> {
        match method {
            Self::NONE => Some(CompressionMethod::None),
            Self::ZLIB_DEFLATE => Some(CompressionMethod::Zlib),
            _ => None,
        }
    }
}

/// One log container, read but not yet decompressed
#[derive(Debug, Clone)]
pub struct LogContainer {
    /// File offset of the container object
    pub offset: u64,
    /// Compression method as stored in the file
    pub method: u16,
    pub uncompressed_size: u32,
    pub payload: Vec<u8>,
}

impl LogContainer {
    /// Parse a container from its object body (everything after the object
    /// header). `offset` is the file offset of the container object.
    pub fn parse(body: &[u8], offset: u64) -> Result<Self> {
        let mut cursor = ByteCursor::new(body);
        let header = read_container_header(&mut cursor);

        let (method, uncompressed_size) = header.map_err(|_| DecoderError::CorruptContainer {
            offset,
            reason: format!(
                "container body of {} bytes is shorter than its {} byte header",
                body.len(),
                LOG_CONTAINER_HEADER_SIZE
            ),
        })?;

        Ok(LogContainer {
            offset,
            method,
            uncompressed_size,
            payload: cursor.rest().to_vec(),
        })
    }

    pub fn compression_method(&self) -> Result<CompressionMethod> {
        CompressionMethod::from_raw(self.method).ok_or(DecoderError::UnsupportedCompression {
            offset: self.offset,
            method: self.method,
        })
    }

    /// Inflate the payload.
    ///
    /// The result must be exactly `uncompressed_size` bytes; anything else is
    /// reported as [`DecoderError::CorruptContainer`].
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let expected = self.uncompressed_size as usize;
        let data = match self.compression_method()? {
            CompressionMethod::None => self.payload.clone(),
            CompressionMethod::Zlib => {
                // One byte past the declared size is enough to detect overlong streams
                let mut decoder = ZlibDecoder::new(self.payload.as_slice()).take(expected as u64 + 1);
                // Deflate cannot expand beyond 1032:1, so cap the untrusted size
                let capacity = expected.min(self.payload.len().saturating_mul(1032));
                let mut data = Vec::with_capacity(capacity);
                decoder
                    .read_to_end(&mut data)
                    .map_err(|e| DecoderError::CorruptContainer {
                        offset: self.offset,
                        reason: format!("zlib decompression failed: {}", e),
                    })?;
                data
            }
        };

        if data.len() != expected {
            return Err(DecoderError::CorruptContainer {
                offset: self.offset,
                reason: format!(
                    "declared uncompressed size {} but payload holds {} bytes",
                    expected,
                    data.len()
                ),
            });
        }

        log::trace!(
            "Container at offset {}: {} -> {} bytes",
            self.offset,
            self.payload.len(),
            data.len()
        );
        Ok(data)
    }
}

fn read_container_header(cursor: &mut ByteCursor<'_>) -> Result<(u16, u32)> {
    let method = cursor.read_u16()?;
    cursor.skip(6)?;
    let uncompressed_size = cursor.read_u32()?;
    cursor.skip(4)?;
    Ok((method, uncompressed_size))
}
