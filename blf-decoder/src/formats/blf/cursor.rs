//! Bounds-checked little-endian cursor over a byte slice
//!
//! Every BLF structure is little-endian and densely packed, so all parsing
//! goes through [`ByteCursor`]. Reads past the end of the slice fail with
//! [`DecoderError::OutOfBounds`] instead of panicking.

use crate::types::{DecoderError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Sequential reader over a borrowed buffer
///
/// `base` is the logical offset of `data[0]` in the enclosing stream, so
/// errors can report where in the file (or object stream) they happened.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at_offset(data, 0)
    }

    /// Cursor whose reported offsets start at `base`
    pub fn at_offset(data: &'a [u8], base: u64) -> Self {
        Self { data, pos: 0, base }
    }

    /// Position relative to the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Logical offset of the current position in the enclosing stream
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Bytes from the current position to the end, without advancing
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(DecoderError::OutOfBounds {
                offset: self.offset(),
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Move to an absolute position within the buffer
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(DecoderError::OutOfBounds {
                offset: self.base + pos as u64,
                needed: pos - self.pos.min(pos),
                remaining: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [
            0x01, // u8
            0x34, 0x12, // u16
            0x78, 0x56, 0x34, 0x12, // u32
            0xFE, 0xFF, 0xFF, 0xFF, // i32 = -2
            0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // u64
        ];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_i32().unwrap(), -2);
        assert_eq!(cursor.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_out_of_bounds_does_not_advance() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut cursor = ByteCursor::at_offset(&data, 100);
        cursor.skip(1).unwrap();

        match cursor.read_u32() {
            Err(DecoderError::OutOfBounds {
                offset,
                needed,
                remaining,
            }) => {
                assert_eq!(offset, 101);
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected OutOfBounds, got {:?}", other),
        }
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[0xBB, 0xCC]);
    }

    #[test]
    fn test_skip_and_seek() {
        let data = [0u8; 8];
        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.skip(9).is_err());
        cursor.skip(8).unwrap();
        assert_eq!(cursor.remaining(), 0);
        cursor.seek(2).unwrap();
        assert_eq!(cursor.position(), 2);
        assert!(cursor.seek(9).is_err());
    }

    #[test]
    fn test_rest_does_not_advance() {
        let data = *b"LOBJrest";
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(4).unwrap();
        assert_eq!(cursor.rest(), b"rest");
        assert_eq!(cursor.position(), 4);
    }
}
