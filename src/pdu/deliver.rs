// SMS-DELIVER PDU walker (TS 23.040 9.2.2.1)
//
// Fields are read strictly in wire order and every read is bounds checked
// through the codec helpers, so a short or damaged PDU fails with a
// `PduError` rather than yielding partial output.

use crate::codec::{PduError, PduResult, decode_bytes, decode_u8, peek_u8, remaining_slice, skip};
use crate::pdu::hex::hex_decode;
use crate::pdu::septet::decode_septets;
use crate::pdu::timestamp::{ServiceCentreTimestamp, TIMESTAMP_LEN};
use crate::pdu::ucs2::decode_ucs2;
use chrono::{Datelike, Local};
use std::io::Cursor;

/// TP-VPF present bit in the first octet
const FLAG_VALIDITY_PRESENT: u8 = 0x10;
/// TP-VPF absolute (seven octet) format bit
const FLAG_VALIDITY_ABSOLUTE: u8 = 0x08;
/// TP-UDHI: user data starts with a header
const FLAG_USER_DATA_HEADER: u8 = 0x40;

/// Type-of-number bits of the type-of-address octet
const TON_MASK: u8 = 0x70;
const TON_ALPHANUMERIC: u8 = 0x50;

/// Sender, timestamp and text extracted from one SMS-DELIVER PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduFields {
    pub sender: String,
    pub timestamp: String,
    pub message: String,
}

/// Alphabet selected by the data coding scheme octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCodingScheme {
    /// GSM 7-bit default alphabet
    Gsm7Bit,
    /// 8-bit data, not decoded
    EightBit,
    /// UCS-2 (big endian)
    Ucs2,
}

impl DataCodingScheme {
    /// Classify a raw TP-DCS octet by its alphabet bits
    pub fn from_byte(dcs: u8) -> Self {
        if dcs & 0x08 != 0 {
            DataCodingScheme::Ucs2
        } else if dcs & 0x04 != 0 {
            DataCodingScheme::EightBit
        } else {
            DataCodingScheme::Gsm7Bit
        }
    }
}

/// Decode a hex SMS-DELIVER PDU as listed by `AT+CMGL` in PDU mode
pub fn parse_pdu(hex: &str) -> PduResult<PduFields> {
    parse_pdu_at(hex, Local::now().year())
}

/// Decode a hex PDU, resolving the timestamp century against `current_year`
pub fn parse_pdu_at(hex: &str, current_year: i32) -> PduResult<PduFields> {
    let buffer = hex_decode(hex)?;
    let mut buf = Cursor::new(&buffer[..]);

    let smsc_len = decode_u8(&mut buf, "SMSC length")?;
    skip(&mut buf, smsc_len as usize, "SMSC address")?;

    let flags = decode_u8(&mut buf, "first octet")?;
    let sender = decode_originator(&mut buf)?;

    let _protocol_id = decode_u8(&mut buf, "protocol identifier")?;
    let dcs = decode_u8(&mut buf, "data coding scheme")?;

    let scts = decode_bytes(&mut buf, TIMESTAMP_LEN, "timestamp")?;
    let timestamp = ServiceCentreTimestamp::decode_at(&scts, current_year)?.to_string();

    if flags & FLAG_VALIDITY_PRESENT != 0 {
        let len = if flags & FLAG_VALIDITY_ABSOLUTE != 0 { 7 } else { 1 };
        skip(&mut buf, len, "validity period")?;
    }

    let user_data_len = decode_u8(&mut buf, "user data length")? as usize;
    let has_header = flags & FLAG_USER_DATA_HEADER != 0;

    let message = match DataCodingScheme::from_byte(dcs) {
        DataCodingScheme::Ucs2 => {
            let mut octets = user_data_len;
            if has_header {
                let header_len = decode_u8(&mut buf, "user data header length")? as usize;
                octets = octets
                    .checked_sub(header_len + 1)
                    .ok_or(PduError::Incomplete { field: "user data header" })?;
                skip(&mut buf, header_len, "user data header")?;
            }
            decode_ucs2(&decode_bytes(&mut buf, octets, "user data")?)?
        }
        DataCodingScheme::EightBit => return Err(PduError::UnsupportedEncoding(dcs)),
        DataCodingScheme::Gsm7Bit => {
            let skip_septets = if has_header {
                header_septets(peek_u8(&buf, "user data header length")?)
            } else {
                0
            };
            decode_septets(remaining_slice(&buf), user_data_len, skip_septets)?
        }
    };

    Ok(PduFields {
        sender,
        timestamp,
        message,
    })
}

/// Septets occupied by a user data header of `header_len` octets plus its
/// length octet. Rounded to nearest rather than up.
pub fn header_septets(header_len: u8) -> usize {
    ((header_len as usize + 1) * 8 + 3) / 7
}

/// TP-OA: digit count, type of address, then the semi-octet digits
fn decode_originator(buf: &mut Cursor<&[u8]>) -> PduResult<String> {
    let digits = decode_u8(buf, "originator length")? as usize;
    let type_of_address = decode_u8(buf, "originator type")?;
    let octets = decode_bytes(buf, digits.div_ceil(2), "originator address")?;

    if type_of_address & TON_MASK == TON_ALPHANUMERIC {
        return decode_septets(&octets, digits * 4 / 7, 0);
    }

    Ok(octets
        .iter()
        .flat_map(|octet| [octet & 0x0F, octet >> 4])
        .take(digits)
        .map(semi_octet_char)
        .collect())
}

fn semi_octet_char(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        0x0A => '*',
        0x0B => '#',
        0x0C => 'a',
        0x0D => 'b',
        0x0E => 'c',
        _ => 'f',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::septet::{pack_septets, pack_septets_into};

    // SMSC +491710760000, sender +491701234567, 2012-05-03 09:15:30 +02:00, "hello"
    const HELLO_PDU: &str = "0791947101670000040C91947110325476000021503090510380";
    const HELLO_UD: &str = "05E8329BFD06";

    fn hello_pdu() -> String {
        format!("{HELLO_PDU}{HELLO_UD}")
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }

    /// Build an SMS-DELIVER from sender 491701234567 with the sample timestamp
    fn deliver(first_octet: u8, dcs: u8, extra: &str, user_data: &[u8], udl: u8) -> String {
        format!(
            "00{:02X}0C9194711032547600{:02X}21503090510380{}{:02X}{}",
            first_octet,
            dcs,
            extra,
            udl,
            hex(user_data)
        )
    }

    #[test]
    fn parses_seven_bit_message() {
        let fields = parse_pdu_at(&hello_pdu(), 2026).unwrap();
        assert_eq!(
            fields,
            PduFields {
                sender: "491701234567".to_string(),
                timestamp: "2012-05-03T09:15:30+02:00".to_string(),
                message: "hello".to_string(),
            }
        );
    }

    #[test]
    fn parse_pdu_uses_local_clock() {
        let fields = parse_pdu(&hello_pdu()).unwrap();
        assert_eq!(fields.sender, "491701234567");
        assert_eq!(fields.message, "hello");
    }

    #[test]
    fn truncated_pdu_fails_cleanly() {
        let full = hello_pdu();
        let truncated = &full[..full.len() - 2];
        assert_eq!(
            parse_pdu_at(truncated, 2026),
            Err(PduError::Incomplete { field: "user data" })
        );
    }

    #[test]
    fn every_prefix_fails_without_panicking() {
        let full = hello_pdu();
        for end in 0..full.len() - 1 {
            assert!(parse_pdu_at(&full[..end], 2026).is_err(), "prefix {end}");
        }
    }

    #[test]
    fn odd_length_sender_drops_filler() {
        // 11 digits: 49170123456, last octet padded with F
        let pdu = format!("00040B919471103254F6000021503090510380{HELLO_UD}");
        let fields = parse_pdu_at(&pdu, 2026).unwrap();
        assert_eq!(fields.sender, "49170123456");
    }

    #[test]
    fn alphanumeric_sender() {
        let name = pack_septets(&[0x47, 0x6F, 0x6F, 0x67, 0x6C, 0x65]);
        let pdu = format!("00040BD0{}000021503090510380{HELLO_UD}", hex(&name));
        let fields = parse_pdu_at(&pdu, 2026).unwrap();
        assert_eq!(fields.sender, "Google");
    }

    #[test]
    fn parses_ucs2_message() {
        let pdu = deliver(0x04, 0x08, "", &[0x00, 0x48, 0x00, 0x69, 0x20, 0xAC], 6);
        let fields = parse_pdu_at(&pdu, 2026).unwrap();
        assert_eq!(fields.message, "Hi€");
    }

    #[test]
    fn ucs2_with_header_skips_header() {
        let user_data = [0x05, 0x00, 0x03, 0x2A, 0x02, 0x01, 0x00, 0x4F, 0x00, 0x4B];
        let pdu = deliver(0x44, 0x08, "", &user_data, user_data.len() as u8);
        let fields = parse_pdu_at(&pdu, 2026).unwrap();
        assert_eq!(fields.message, "OK");
    }

    #[test]
    fn ucs2_header_longer_than_user_data_fails() {
        // UDL of 4 cannot hold a 5 octet header plus its length octet
        let user_data = [0x05, 0x00, 0x03, 0x2A, 0x02, 0x01, 0x00, 0x4F];
        let pdu = deliver(0x44, 0x08, "", &user_data, 4);
        assert_eq!(
            parse_pdu_at(&pdu, 2026),
            Err(PduError::Incomplete { field: "user data header" })
        );
    }

    #[test]
    fn binary_message_is_rejected() {
        let pdu = deliver(0x04, 0x04, "", &[0x01, 0x02], 2);
        assert_eq!(parse_pdu_at(&pdu, 2026), Err(PduError::UnsupportedEncoding(0x04)));
    }

    #[test]
    fn seven_bit_with_header_skips_header_septets() {
        // Concatenation header: 05 00 03 2A 02 01 -> six octets, seven septets
        let mut user_data = vec![0x05, 0x00, 0x03, 0x2A, 0x02, 0x01];
        pack_septets_into(&mut user_data, 7, &[0x68, 0x69]);
        let pdu = deliver(0x44, 0x00, "", &user_data, 9);
        let fields = parse_pdu_at(&pdu, 2026).unwrap();
        assert_eq!(fields.message, "hi");
    }

    #[test]
    fn relative_validity_period_is_skipped() {
        let pdu = deliver(0x14, 0x00, "A7", &[0xE8, 0x32, 0x9B, 0xFD, 0x06], 5);
        assert_eq!(parse_pdu_at(&pdu, 2026).unwrap().message, "hello");
    }

    #[test]
    fn absolute_validity_period_is_skipped() {
        let pdu = deliver(0x1C, 0x00, "21503090510380", &[0xE8, 0x32, 0x9B, 0xFD, 0x06], 5);
        assert_eq!(parse_pdu_at(&pdu, 2026).unwrap().message, "hello");
    }

    #[test]
    fn bad_timestamp_fails() {
        let pdu = format!("00040C91947110325476000021F03090510380{HELLO_UD}");
        assert!(matches!(
            parse_pdu_at(&pdu, 2026),
            Err(PduError::InvalidSemiOctet { field: "month", .. })
        ));
    }

    #[test]
    fn non_hex_input_fails() {
        assert!(matches!(
            parse_pdu_at("07919471XX", 2026),
            Err(PduError::InvalidHex { .. })
        ));
    }

    #[test]
    fn header_septet_rounding() {
        assert_eq!(header_septets(5), 7);
        assert_eq!(header_septets(6), 8);
        assert_eq!(header_septets(7), 9);
    }

    #[test]
    fn coding_scheme_classification() {
        assert_eq!(DataCodingScheme::from_byte(0x00), DataCodingScheme::Gsm7Bit);
        assert_eq!(DataCodingScheme::from_byte(0xF0), DataCodingScheme::Gsm7Bit);
        assert_eq!(DataCodingScheme::from_byte(0x04), DataCodingScheme::EightBit);
        assert_eq!(DataCodingScheme::from_byte(0x08), DataCodingScheme::Ucs2);
        assert_eq!(DataCodingScheme::from_byte(0x18), DataCodingScheme::Ucs2);
    }
}
