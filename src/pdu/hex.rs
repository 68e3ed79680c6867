use crate::codec::{PduError, PduResult};

/// Decode a hex-digit string into bytes, two digits per byte.
///
/// A single trailing digit is decoded on its own, so `"A"` yields `0x0A`.
/// Any character outside `[0-9A-Fa-f]` is rejected.
pub fn hex_decode(hex: &str) -> PduResult<Vec<u8>> {
    let digits = hex.as_bytes();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));

    for (pair_index, pair) in digits.chunks(2).enumerate() {
        let offset = pair_index * 2;
        let high = nibble(pair[0], offset)?;
        match pair.get(1) {
            Some(&low) => out.push((high << 4) | nibble(low, offset + 1)?),
            None => out.push(high),
        }
    }

    Ok(out)
}

fn nibble(digit: u8, offset: usize) -> PduResult<u8> {
    (digit as char)
        .to_digit(16)
        .map(|value| value as u8)
        .ok_or(PduError::InvalidHex {
            character: digit as char,
            offset,
        })
}
