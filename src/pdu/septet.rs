//! GSM 03.38 7-bit default alphabet and septet unpacking.
//!
//! Eight septets are packed into seven octets, least significant bit first, so
//! a septet may straddle two bytes. Code `0x1B` is the escape to the extension
//! page; it applies to the next symbol only.

use crate::codec::{PduError, PduResult};

/// Escape code switching the next septet to the extension page
pub const ESCAPE: u8 = 0x1B;

/// Default alphabet page
pub const DEFAULT_PAGE: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\x1b', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension page; unassigned slots decode as '?'
pub const EXTENSION_PAGE: [char; 128] = {
    let mut page = ['?'; 128];
    page[0x0A] = '\n';
    page[0x0D] = '\r';
    page[0x14] = '^';
    page[0x1B] = '\x1b';
    page[0x28] = '{';
    page[0x29] = '}';
    page[0x2F] = '\\';
    page[0x3C] = '[';
    page[0x3D] = '~';
    page[0x3E] = ']';
    page[0x40] = '|';
    page[0x65] = '€';
    page
};

/// Which of the two alphabet pages the next septet resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphabetPage {
    #[default]
    Default,
    Extension,
}

impl AlphabetPage {
    pub fn table(self) -> &'static [char; 128] {
        match self {
            AlphabetPage::Default => &DEFAULT_PAGE,
            AlphabetPage::Extension => &EXTENSION_PAGE,
        }
    }
}

/// Unpack `char_count` septets from `data`, dropping the first `skip` of them.
///
/// `char_count` counts every septet including the skipped ones, which is how
/// the user-data length of a 7-bit PDU is expressed. Running out of bytes
/// before the last septet is complete is an error, never a shorter string.
pub fn decode_septets(data: &[u8], char_count: usize, skip: usize) -> PduResult<String> {
    let mut decoded = String::with_capacity(char_count.saturating_sub(skip));
    let mut page = AlphabetPage::Default;

    for index in 0..char_count {
        let code = septet_at(data, index)?;

        if index < skip {
            continue;
        }

        if code == ESCAPE {
            page = AlphabetPage::Extension;
            continue;
        }

        decoded.push(page.table()[code as usize]);
        page = AlphabetPage::Default;
    }

    Ok(decoded)
}

/// Extract the septet at `index` from a packed buffer
fn septet_at(data: &[u8], index: usize) -> PduResult<u8> {
    let bit = index * 7;
    let byte = bit / 8;
    let shift = bit % 8;

    let low = *data.get(byte).ok_or(PduError::Incomplete { field: "user data" })? >> shift;

    // With a shift of 0 or 1 all seven bits sit in the current byte
    let code = if shift > 1 {
        let high = *data
            .get(byte + 1)
            .ok_or(PduError::Incomplete { field: "user data" })?;
        low | (high << (8 - shift))
    } else {
        low
    };

    Ok(code & 0x7F)
}

/// Pack septets starting at septet `offset` of `out`, growing it as needed
#[cfg(test)]
pub(crate) fn pack_septets_into(out: &mut Vec<u8>, offset: usize, septets: &[u8]) {
    let needed = ((offset + septets.len()) * 7).div_ceil(8);
    if out.len() < needed {
        out.resize(needed, 0);
    }
    for (i, &s) in septets.iter().enumerate() {
        let bit = (offset + i) * 7;
        let (byte, shift) = (bit / 8, bit % 8);
        out[byte] |= s << shift;
        if shift > 1 {
            out[byte + 1] |= s >> (8 - shift);
        }
    }
}

#[cfg(test)]
pub(crate) fn pack_septets(septets: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    pack_septets_into(&mut out, 0, septets);
    out
}
