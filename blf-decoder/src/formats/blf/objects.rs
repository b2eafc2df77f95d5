//! Object body decoders
//!
//! One decoder per supported object type, dispatched on the header's type
//! tag. Each decoder gets a cursor spanning exactly the object body, so a
//! body shorter than its layout surfaces as [`DecoderError::MalformedBody`]
//! rather than reading into the next object.
//!
//! ## Supported Object Types
//! - Type 1 (CAN_MESSAGE) and 86 (CAN_MESSAGE2): classic data and remote frames
//! - Type 100 (CAN_FD_MESSAGE) and 101 (CAN_FD_MESSAGE_64): CAN-FD frames
//! - Type 2 (CAN_ERROR) and 73 (CAN_ERROR_EXT): error frames
//!
//! Any other tag is [`ObjectKind::Unknown`] and is skipped by the reader.

use super::cursor::ByteCursor;
use super::header::ObjectHeader;
use crate::types::{
    dlc_to_byte_length, CanFdMessage, CanMessage, DecoderError, Direction, ErrorFrame,
    RemoteFrame, Record, Result, MAX_EXTENDED_ID, MAX_STANDARD_ID,
};

pub const CAN_MESSAGE: u32 = 1;
pub const CAN_ERROR: u32 = 2;
pub const LOG_CONTAINER: u32 = 10;
pub const CAN_ERROR_EXT: u32 = 73;
pub const CAN_MESSAGE2: u32 = 86;
pub const CAN_FD_MESSAGE: u32 = 100;
pub const CAN_FD_MESSAGE_64: u32 = 101;

/// Extended ID marker in the identifier word
const CAN_MSG_EXT: u32 = 0x8000_0000;

// Message flags (CAN_MESSAGE, CAN_MESSAGE2, CAN_FD_MESSAGE)
const DIR: u8 = 0x01;
const REMOTE_FLAG: u8 = 0x80;

// FD flags (CAN_FD_MESSAGE)
const EDL: u8 = 0x01;
const BRS: u8 = 0x02;
const ESI: u8 = 0x04;

// Flags (CAN_FD_MESSAGE_64)
const FD64_REMOTE: u32 = 0x0010;
const FD64_EDL: u32 = 0x1000;
const FD64_BRS: u32 = 0x2000;
const FD64_ESI: u32 = 0x4000;

/// Fixed part of a CAN_FD_MESSAGE_64 body, before the payload
const CAN_FD_MESSAGE_64_FIXED_SIZE: usize = 40;

/// Object types the decoder distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    CanMessage,
    CanFdMessage,
    CanFdMessage64,
    CanError,
    CanErrorExt,
    LogContainer,
    Unknown(u32),
}

impl ObjectKind {
    pub fn from_type(object_type: u32) -> Self {
        match object_type {
            CAN_MESSAGE | CAN_MESSAGE2 => ObjectKind::CanMessage,
            CAN_FD_MESSAGE => ObjectKind::CanFdMessage,
            CAN_FD_MESSAGE_64 => ObjectKind::CanFdMessage64,
            CAN_ERROR => ObjectKind::CanError,
            CAN_ERROR_EXT => ObjectKind::CanErrorExt,
            LOG_CONTAINER => ObjectKind::LogContainer,
            other => ObjectKind::Unknown(other),
        }
    }
}

/// Decode one object body into a record.
///
/// `body` spans exactly `object_size - header_size` bytes. `start_time` is the
/// measurement start in seconds. Returns `Ok(None)` for object types that do
/// not produce records.
pub fn decode_object(
    header: &ObjectHeader,
    body: &mut ByteCursor<'_>,
    start_time: f64,
) -> Result<Option<Record>> {
    let ctx = BodyContext {
        object_type: header.object_type,
        offset: body.offset(),
        timestamp: start_time + header.timestamp_seconds(),
    };

    let record = match ObjectKind::from_type(header.object_type) {
        ObjectKind::CanMessage => decode_can_message(&ctx, body),
        ObjectKind::CanFdMessage => decode_can_fd_message(&ctx, body),
        ObjectKind::CanFdMessage64 => decode_can_fd_message_64(&ctx, header, body),
        ObjectKind::CanError => decode_can_error(&ctx, body),
        ObjectKind::CanErrorExt => decode_can_error_ext(&ctx, body),
        ObjectKind::LogContainer | ObjectKind::Unknown(_) => return Ok(None),
    };

    record.map(Some).map_err(|e| ctx.short_body(e))
}

/// Where the body being decoded lives, for error reporting
struct BodyContext {
    object_type: u32,
    offset: u64,
    timestamp: f64,
}

impl BodyContext {
    fn malformed(&self, reason: impl Into<String>) -> DecoderError {
        DecoderError::MalformedBody {
            object_type: self.object_type,
            offset: self.offset,
            reason: reason.into(),
        }
    }

    /// A body read that ran off the end is a malformed body
    fn short_body(&self, err: DecoderError) -> DecoderError {
        match err {
            DecoderError::OutOfBounds {
                offset,
                needed,
                remaining,
            } => self.malformed(format!(
                "body too short: needed {} bytes at offset {}, {} remaining",
                needed, offset, remaining
            )),
            other => other,
        }
    }

    /// Split the identifier word into ID and extended flag, checking width
    fn arbitration_id(&self, raw: u32) -> Result<(u32, bool)> {
        let is_extended = raw & CAN_MSG_EXT != 0;
        let id = raw & !CAN_MSG_EXT;
        let max = if is_extended { MAX_EXTENDED_ID } else { MAX_STANDARD_ID };
        if id > max {
            return Err(self.malformed(format!(
                "arbitration id 0x{:X} exceeds {} range",
                id,
                if is_extended { "29-bit" } else { "11-bit" }
            )));
        }
        Ok((id, is_extended))
    }

    fn classic_dlc(&self, dlc: u8) -> Result<usize> {
        if dlc > 8 {
            return Err(self.malformed(format!("dlc {} exceeds classic CAN maximum of 8", dlc)));
        }
        Ok(dlc as usize)
    }

    fn fd_dlc(&self, dlc: u8) -> Result<usize> {
        dlc_to_byte_length(dlc)
            .ok_or_else(|| self.malformed(format!("dlc {} is not a valid CAN-FD code", dlc)))
    }

    fn check_payload_length(&self, dlc: u8, expected: usize, valid_bytes: u8) -> Result<()> {
        if valid_bytes as usize != expected {
            return Err(self.malformed(format!(
                "{} valid data bytes but dlc {} implies {}",
                valid_bytes, dlc, expected
            )));
        }
        Ok(())
    }
}

/// Channels are 1-based on disk
fn zero_based(channel: u16) -> u16 {
    channel.saturating_sub(1)
}

fn direction(tx: bool) -> Direction {
    if tx {
        Direction::Tx
    } else {
        Direction::Rx
    }
}

/// CAN_MESSAGE / CAN_MESSAGE2: channel, flags, dlc, id, data[8]
fn decode_can_message(ctx: &BodyContext, body: &mut ByteCursor<'_>) -> Result<Record> {
    let channel = body.read_u16()?;
    let flags = body.read_u8()?;
    let dlc = body.read_u8()?;
    let (arbitration_id, is_extended_id) = ctx.arbitration_id(body.read_u32()?)?;
    let data = body.read_bytes(8)?;
    let len = ctx.classic_dlc(dlc)?;

    if flags & REMOTE_FLAG != 0 {
        return Ok(Record::Remote(RemoteFrame {
            timestamp: ctx.timestamp,
            channel: zero_based(channel),
            arbitration_id,
            is_extended_id,
            direction: direction(flags & DIR != 0),
            dlc,
        }));
    }

    Ok(Record::Can(CanMessage {
        timestamp: ctx.timestamp,
        channel: zero_based(channel),
        arbitration_id,
        is_extended_id,
        direction: direction(flags & DIR != 0),
        dlc,
        data: data[..len].to_vec(),
    }))
}

/// CAN_FD_MESSAGE: channel, flags, dlc, id, frame length, bit count, fd flags,
/// valid bytes, 5 reserved, data[64]
fn decode_can_fd_message(ctx: &BodyContext, body: &mut ByteCursor<'_>) -> Result<Record> {
    let channel = body.read_u16()?;
    let flags = body.read_u8()?;
    let dlc = body.read_u8()?;
    let (arbitration_id, is_extended_id) = ctx.arbitration_id(body.read_u32()?)?;
    let _frame_length_ns = body.read_u32()?;
    let _bit_count = body.read_u8()?;
    let fd_flags = body.read_u8()?;
    let valid_bytes = body.read_u8()?;
    body.skip(5)?;
    let data = body.read_bytes(64)?;

    build_frame(
        ctx,
        FrameFields {
            channel: zero_based(channel),
            arbitration_id,
            is_extended_id,
            direction: direction(flags & DIR != 0),
            is_remote: flags & REMOTE_FLAG != 0,
            is_fd: fd_flags & EDL != 0,
            bitrate_switch: fd_flags & BRS != 0,
            error_state_indicator: fd_flags & ESI != 0,
            dlc,
            valid_bytes,
        },
        data,
    )
}

/// CAN_FD_MESSAGE_64: 40 byte fixed part, then `valid_bytes` of payload
fn decode_can_fd_message_64(
    ctx: &BodyContext,
    header: &ObjectHeader,
    body: &mut ByteCursor<'_>,
) -> Result<Record> {
    let channel = body.read_u8()?;
    let dlc = body.read_u8()?;
    let valid_bytes = body.read_u8()?;
    let _tx_count = body.read_u8()?;
    let (arbitration_id, is_extended_id) = ctx.arbitration_id(body.read_u32()?)?;
    let _frame_length_ns = body.read_u32()?;
    let flags = body.read_u32()?;
    let _arb_bitrate = body.read_u32()?;
    let _data_bitrate = body.read_u32()?;
    let _brs_offset = body.read_u32()?;
    let _crc_delim_offset = body.read_u32()?;
    let _bit_count = body.read_u16()?;
    let dir = body.read_u8()?;
    let ext_data_offset = body.read_u8()?;
    let _crc = body.read_u32()?;

    // Extended data, when present, starts at ext_data_offset from the object start
    if ext_data_offset != 0 {
        let data_end = header.header_size as usize + CAN_FD_MESSAGE_64_FIXED_SIZE + valid_bytes as usize;
        if data_end > ext_data_offset as usize {
            return Err(ctx.malformed(format!(
                "{} valid data bytes overlap extended data at offset {}",
                valid_bytes, ext_data_offset
            )));
        }
    }

    let is_remote = flags & FD64_REMOTE != 0;
    let data = if is_remote {
        &[][..]
    } else {
        body.read_bytes(valid_bytes as usize)?
    };

    build_frame(
        ctx,
        FrameFields {
            channel: u16::from(channel).saturating_sub(1),
            arbitration_id,
            is_extended_id,
            direction: direction(dir == 1),
            is_remote,
            is_fd: flags & FD64_EDL != 0,
            bitrate_switch: flags & FD64_BRS != 0,
            error_state_indicator: flags & FD64_ESI != 0,
            dlc,
            valid_bytes,
        },
        data,
    )
}

/// Fields shared by the two CAN-FD object layouts
struct FrameFields {
    channel: u16,
    arbitration_id: u32,
    is_extended_id: bool,
    direction: Direction,
    is_remote: bool,
    is_fd: bool,
    bitrate_switch: bool,
    error_state_indicator: bool,
    dlc: u8,
    valid_bytes: u8,
}

/// Build a record from an FD-capable object. Frames without the extended
/// data length bit are classic CAN frames.
fn build_frame(ctx: &BodyContext, f: FrameFields, data: &[u8]) -> Result<Record> {
    let expected = if f.is_fd {
        ctx.fd_dlc(f.dlc)?
    } else {
        ctx.classic_dlc(f.dlc)?
    };

    if f.is_remote {
        return Ok(Record::Remote(RemoteFrame {
            timestamp: ctx.timestamp,
            channel: f.channel,
            arbitration_id: f.arbitration_id,
            is_extended_id: f.is_extended_id,
            direction: f.direction,
            dlc: f.dlc,
        }));
    }

    ctx.check_payload_length(f.dlc, expected, f.valid_bytes)?;
    if data.len() < expected {
        return Err(ctx.malformed(format!(
            "payload holds {} bytes but dlc {} implies {}",
            data.len(),
            f.dlc,
            expected
        )));
    }
    let data = data[..expected].to_vec();

    if !f.is_fd {
        return Ok(Record::Can(CanMessage {
            timestamp: ctx.timestamp,
            channel: f.channel,
            arbitration_id: f.arbitration_id,
            is_extended_id: f.is_extended_id,
            direction: f.direction,
            dlc: f.dlc,
            data,
        }));
    }

    Ok(Record::CanFd(CanFdMessage {
        timestamp: ctx.timestamp,
        channel: f.channel,
        arbitration_id: f.arbitration_id,
        is_extended_id: f.is_extended_id,
        direction: f.direction,
        bitrate_switch: f.bitrate_switch,
        error_state_indicator: f.error_state_indicator,
        dlc: f.dlc,
        data,
    }))
}

/// CAN_ERROR: channel, length
fn decode_can_error(ctx: &BodyContext, body: &mut ByteCursor<'_>) -> Result<Record> {
    let channel = body.read_u16()?;
    let _length = body.read_u16()?;
    Ok(Record::Error(ErrorFrame {
        timestamp: ctx.timestamp,
        channel: zero_based(channel),
        diagnostic_code: None,
    }))
}

/// CAN_ERROR_EXT: channel, length, flags, ecc, position, dlc, ...
fn decode_can_error_ext(ctx: &BodyContext, body: &mut ByteCursor<'_>) -> Result<Record> {
    let channel = body.read_u16()?;
    let _length = body.read_u16()?;
    let _flags = body.read_u32()?;
    let ecc = body.read_u8()?;
    Ok(Record::Error(ErrorFrame {
        timestamp: ctx.timestamp,
        channel: zero_based(channel),
        diagnostic_code: Some(ecc),
    }))
}
