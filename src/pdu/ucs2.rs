use crate::codec::{PduError, PduResult};

/// Decode big-endian UCS-2 user data.
///
/// Surrogate pairs are accepted so that handsets sending UTF-16 decode as well.
/// A dangling odd byte at the end is ignored.
pub fn decode_ucs2(data: &[u8]) -> PduResult<String> {
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| PduError::InvalidUcs2)
}
