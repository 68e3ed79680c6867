//! SMS-DELIVER decoding.
//!
//! [`parse_pdu`] is the entry point used by the modem session; the alphabet
//! and timestamp decoders are exposed for callers that already hold raw
//! octets.

pub mod deliver;
pub mod hex;
pub mod septet;
pub mod timestamp;
pub mod ucs2;

pub use deliver::{DataCodingScheme, PduFields, parse_pdu, parse_pdu_at};
pub use hex::hex_decode;
pub use septet::decode_septets;
pub use timestamp::{ServiceCentreTimestamp, decode_bcd_timestamp, decode_bcd_timestamp_at};
pub use ucs2::decode_ucs2;
