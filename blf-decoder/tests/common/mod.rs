//! Builders for synthetic BLF files used by the integration tests
#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub const CAN_MESSAGE: u32 = 1;
pub const CAN_ERROR: u32 = 2;
pub const LOG_CONTAINER: u32 = 10;
pub const CAN_ERROR_EXT: u32 = 73;
pub const CAN_MESSAGE2: u32 = 86;
pub const CAN_FD_MESSAGE: u32 = 100;

pub const TIME_TEN_MICS: u32 = 1;
pub const TIME_ONE_NANS: u32 = 2;

pub const FILE_HEADER_SIZE: usize = 144;

/// Measurement start written by [`file_header`]: 2024-04-26 18:52:20.500 UTC
pub const START_TIME: f64 = 1_714_157_540.5;

pub fn file_header(object_count: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LOGG");
    buf.extend_from_slice(&(FILE_HEADER_SIZE as u32).to_le_bytes());
    buf.extend_from_slice(&4_070_100u32.to_le_bytes());
    buf.extend_from_slice(&[5, 6, 1, 0]);
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&object_count.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    for v in [2024u16, 4, 5, 26, 18, 52, 20, 500] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for v in [2024u16, 4, 5, 26, 18, 53, 0, 0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.resize(FILE_HEADER_SIZE, 0);
    buf
}

/// An object with a version 1 header (32 bytes), 1 ns timestamps, no padding
pub fn object(object_type: u32, timestamp_ns: u64, body: &[u8]) -> Vec<u8> {
    object_with_flags(object_type, TIME_ONE_NANS, timestamp_ns, body)
}

pub fn object_with_flags(object_type: u32, flags: u32, timestamp: u64, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LOBJ");
    buf.extend_from_slice(&32u16.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&(32 + body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&object_type.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(body);
    buf
}

/// An object with a version 2 header (40 bytes)
pub fn object_v2(object_type: u32, flags: u32, timestamp: u64, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LOBJ");
    buf.extend_from_slice(&40u16.to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&(40 + body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&object_type.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.push(0);
    buf.push(0);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(body);
    buf
}

/// CAN_MESSAGE body: channel (1-based), flags, dlc, id, data[8]
pub fn can_body(channel: u16, flags: u8, dlc: u8, id: u32, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&channel.to_le_bytes());
    body.push(flags);
    body.push(dlc);
    body.extend_from_slice(&id.to_le_bytes());
    let mut payload = [0u8; 8];
    payload[..data.len()].copy_from_slice(data);
    body.extend_from_slice(&payload);
    body
}

/// CAN_ERROR_EXT body with the given error code
pub fn error_ext_body(channel: u16, ecc: u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&channel.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    body.push(ecc);
    body.extend_from_slice(&[0; 23]);
    body
}

pub fn can_message(timestamp_ns: u64, channel: u16, id: u32, data: &[u8]) -> Vec<u8> {
    object(
        CAN_MESSAGE,
        timestamp_ns,
        &can_body(channel, 0, data.len() as u8, id, data),
    )
}

/// Concatenate objects into an uncompressed object stream, padding each
/// object to a multiple of four bytes
pub fn stream(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for obj in objects {
        buf.extend_from_slice(obj);
        buf.resize(buf.len() + obj.len() % 4, 0);
    }
    buf
}

/// A log container object (including its file-level padding)
pub fn container(method: u16, uncompressed_size: u32, payload: &[u8]) -> Vec<u8> {
    let object_size = 16 + 16 + payload.len() as u32;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LOBJ");
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&object_size.to_le_bytes());
    buf.extend_from_slice(&LOG_CONTAINER.to_le_bytes());
    buf.extend_from_slice(&method.to_le_bytes());
    buf.extend_from_slice(&[0; 6]);
    buf.extend_from_slice(&uncompressed_size.to_le_bytes());
    buf.extend_from_slice(&[0; 4]);
    buf.extend_from_slice(payload);
    buf.resize(buf.len() + (object_size % 4) as usize, 0);
    buf
}

pub fn raw_container(data: &[u8]) -> Vec<u8> {
    container(0, data.len() as u32, data)
}

pub fn zlib_container(data: &[u8]) -> Vec<u8> {
    container(2, data.len() as u32, &zlib(data))
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A complete file: header followed by the given file-level objects
pub fn blf_file(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = file_header(objects.len() as u32);
    for obj in objects {
        buf.extend_from_slice(obj);
    }
    buf
}
