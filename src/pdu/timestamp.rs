// Service-centre timestamp (TP-SCTS): seven swapped-nibble BCD octets
// YY MM DD hh mm ss tz, where tz counts quarter hours and carries the sign
// in bit 3 of the octet.

use crate::codec::{PduError, PduResult};
use chrono::{Datelike, Local};
use std::fmt;

/// Number of octets in a TP-SCTS field
pub const TIMESTAMP_LEN: usize = 7;

/// Decoded TP-SCTS with a four-digit year and a whole-hour UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCentreTimestamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub utc_offset_hours: i8,
}

impl ServiceCentreTimestamp {
    /// Decode seven octets, resolving the century against `current_year`.
    pub fn decode_at(octets: &[u8], current_year: i32) -> PduResult<Self> {
        if octets.len() < TIMESTAMP_LEN {
            return Err(PduError::Incomplete { field: "timestamp" });
        }

        let year = expand_year(parse_semi_octets(octets[0], "year")?, current_year);
        let month = in_range(parse_semi_octets(octets[1], "month")?, "month", 1, 12)?;
        let day = in_range(parse_semi_octets(octets[2], "day")?, "day", 1, 31)?;
        let hour = in_range(parse_semi_octets(octets[3], "hour")?, "hour", 0, 23)?;
        let minute = in_range(parse_semi_octets(octets[4], "minute")?, "minute", 0, 59)?;
        let second = in_range(parse_semi_octets(octets[5], "second")?, "second", 0, 59)?;
        let utc_offset_hours = parse_offset(octets[6])?;

        Ok(ServiceCentreTimestamp {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_hours,
        })
    }
}

impl fmt::Display for ServiceCentreTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02}T{:02}:{:02}:{:02}{:+03}:00",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.utc_offset_hours
        )
    }
}

/// Decode a TP-SCTS field into an ISO-8601 string using the local clock's year
pub fn decode_bcd_timestamp(octets: &[u8]) -> PduResult<String> {
    decode_bcd_timestamp_at(octets, Local::now().year())
}

/// Decode a TP-SCTS field into an ISO-8601 string with an explicit current year
pub fn decode_bcd_timestamp_at(octets: &[u8], current_year: i32) -> PduResult<String> {
    ServiceCentreTimestamp::decode_at(octets, current_year).map(|ts| ts.to_string())
}

/// Read a two-digit field stored low nibble first
fn parse_semi_octets(octet: u8, field: &'static str) -> PduResult<u8> {
    let tens = octet & 0x0F;
    let units = octet >> 4;
    if tens > 9 || units > 9 {
        return Err(PduError::InvalidSemiOctet {
            field,
            value: octet,
        });
    }
    Ok(tens * 10 + units)
}

fn in_range(value: u8, field: &'static str, min: u8, max: u8) -> PduResult<u8> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(PduError::InvalidTimestamp { field, value })
    }
}

/// Place a two-digit year in the current century, or the previous one if it
/// would otherwise lie in the future
fn expand_year(two_digit: u8, current_year: i32) -> i32 {
    let year = (current_year / 100) * 100 + two_digit as i32;
    if year > current_year { year - 100 } else { year }
}

/// Quarter hours to whole hours; half-hour zones truncate. The sign lives in
/// bit 3 of the first (low) semi-octet.
fn parse_offset(octet: u8) -> PduResult<i8> {
    let negative = octet & 0x08 != 0;
    let tens = octet & 0x07;
    let units = octet >> 4;
    if units > 9 {
        return Err(PduError::InvalidSemiOctet {
            field: "timezone",
            value: octet,
        });
    }

    let quarters = (tens * 10 + units) as i32;
    let hours = (quarters * 15 / 60) as i8;

    Ok(if negative { -hours } else { hours })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 12-05-03 09:15:30, UTC
    const SAMPLE: [u8; 7] = [0x21, 0x50, 0x30, 0x90, 0x51, 0x03, 0x00];

    #[test]
    fn decodes_sample_in_current_century() {
        assert_eq!(
            decode_bcd_timestamp_at(&SAMPLE, 2026).unwrap(),
            "2012-05-03T09:15:30+00:00"
        );
    }

    #[test]
    fn decodes_with_local_clock() {
        // Holds for any clock between 2012 and 2111
        assert_eq!(
            decode_bcd_timestamp(&SAMPLE).unwrap(),
            "2012-05-03T09:15:30+00:00"
        );
    }

    #[test]
    fn future_year_rolls_back_a_century() {
        let mut octets = SAMPLE;
        octets[0] = 0x99; // 99
        let ts = ServiceCentreTimestamp::decode_at(&octets, 2026).unwrap();
        assert_eq!(ts.year, 1999);

        octets[0] = 0x62; // 26
        let ts = ServiceCentreTimestamp::decode_at(&octets, 2026).unwrap();
        assert_eq!(ts.year, 2026);
    }

    #[test]
    fn positive_offset_in_quarter_hours() {
        let mut octets = SAMPLE;
        octets[6] = 0x80; // 08 quarters = +2h
        assert_eq!(
            decode_bcd_timestamp_at(&octets, 2026).unwrap(),
            "2012-05-03T09:15:30+02:00"
        );
    }

    #[test]
    fn negative_offset_sets_sign_bit() {
        let mut octets = SAMPLE;
        octets[6] = 0x88; // 08 quarters, sign bit set
        let ts = ServiceCentreTimestamp::decode_at(&octets, 2026).unwrap();
        assert_eq!(ts.utc_offset_hours, -2);
        assert!(ts.to_string().ends_with("-02:00"));
    }

    #[test]
    fn half_hour_zone_truncates() {
        let mut octets = SAMPLE;
        octets[6] = 0x22; // 22 quarters = 5.5h
        let ts = ServiceCentreTimestamp::decode_at(&octets, 2026).unwrap();
        assert_eq!(ts.utc_offset_hours, 5);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let mut octets = SAMPLE;
        octets[1] = 0x31; // 13
        assert_eq!(
            ServiceCentreTimestamp::decode_at(&octets, 2026),
            Err(PduError::InvalidTimestamp {
                field: "month",
                value: 13
            })
        );
    }

    #[test]
    fn zero_day_and_late_hour_are_rejected() {
        let mut octets = SAMPLE;
        octets[2] = 0x00;
        assert!(ServiceCentreTimestamp::decode_at(&octets, 2026).is_err());

        let mut octets = SAMPLE;
        octets[3] = 0x42; // 24
        assert!(ServiceCentreTimestamp::decode_at(&octets, 2026).is_err());
    }

    #[test]
    fn non_decimal_nibble_is_rejected() {
        let mut octets = SAMPLE;
        octets[4] = 0x1F;
        assert_eq!(
            ServiceCentreTimestamp::decode_at(&octets, 2026),
            Err(PduError::InvalidSemiOctet {
                field: "minute",
                value: 0x1F
            })
        );
    }

    #[test]
    fn short_input_is_incomplete() {
        assert!(matches!(
            ServiceCentreTimestamp::decode_at(&SAMPLE[..6], 2026),
            Err(PduError::Incomplete { .. })
        ));
    }
}
