// GSM PDU Codec - error type and bounds-checked field readers
//
// Every field read in the PDU walker goes through these helpers so that a
// truncated buffer surfaces as `PduError::Incomplete` instead of a panic or a
// read past the end of the input.

use bytes::Buf;
use std::io::Cursor;
use thiserror::Error;

/// Codec errors with enough context to tell which PDU field was short or bad
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PduError {
    #[error("Incomplete PDU: ran out of data while reading {field}")]
    Incomplete { field: &'static str },

    #[error("Invalid hex digit {character:?} at offset {offset}")]
    InvalidHex { character: char, offset: usize },

    #[error("Invalid semi-octet {value:#x} in {field}")]
    InvalidSemiOctet { field: &'static str, value: u8 },

    #[error("Timestamp field '{field}' out of range: {value}")]
    InvalidTimestamp { field: &'static str, value: u8 },

    #[error("Unsupported data coding scheme: {0:#04x}")]
    UnsupportedEncoding(u8),

    #[error("Invalid UTF-16 sequence in UCS-2 user data")]
    InvalidUcs2,
}

/// Result type alias for PDU decoding
pub type PduResult<T> = Result<T, PduError>;

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> PduResult<u8> {
    if buf.remaining() < 1 {
        return Err(PduError::Incomplete { field });
    }
    Ok(buf.get_u8())
}

/// Copy out exactly `len` bytes
pub fn decode_bytes(buf: &mut Cursor<&[u8]>, len: usize, field: &'static str) -> PduResult<Vec<u8>> {
    if buf.remaining() < len {
        return Err(PduError::Incomplete { field });
    }
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Advance past `len` bytes without looking at them
pub fn skip(buf: &mut Cursor<&[u8]>, len: usize, field: &'static str) -> PduResult<()> {
    if buf.remaining() < len {
        return Err(PduError::Incomplete { field });
    }
    buf.advance(len);
    Ok(())
}

/// Peek at the next byte without advancing the cursor
pub fn peek_u8(buf: &Cursor<&[u8]>, field: &'static str) -> PduResult<u8> {
    buf.chunk()
        .first()
        .copied()
        .ok_or(PduError::Incomplete { field })
}

/// The unread tail of the buffer
pub fn remaining_slice<'a>(buf: &Cursor<&'a [u8]>) -> &'a [u8] {
    let data: &'a [u8] = buf.get_ref();
    let pos = (buf.position() as usize).min(data.len());
    &data[pos..]
}
