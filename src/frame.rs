// ABOUTME: Classifies AT response lines into terminal results, unsolicited result codes and noise
// ABOUTME: Also extracts the individual fields the session cares about from result-code values

use regex::Regex;
use std::sync::LazyLock;

/// `+CODE: value` prefix of an unsolicited or information result code
static RESULT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+[A-Za-z0-9]+):\s+").expect("result code pattern is valid")
});

/// `<alpha>,<number>,<type>` where the first two fields may be single or double quoted
static SUBSCRIBER_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"[^"]*"|'[^']*'|[^,]*),(?:"([^"]*)"|'([^']*)'|([^,]*)),"#)
        .expect("subscriber number pattern is valid")
});

/// Leading quoted or bare field of a `+CLIP` value
static CALLER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"([^"]*)"|([^,"]+))"#).expect("caller id pattern is valid")
});

/// Storage index at the start of a `+CMGL` value
static LISTING_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+),").expect("listing index pattern is valid"));

/// One line read from the modem, as seen by the command engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Final result `OK`
    Ok,
    /// Final result `ERROR`
    Error,
    /// `+CODE: value`. `value` is everything after the separator whitespace.
    ResultCode { code: &'a str, value: &'a str },
    /// Empty or whitespace-only line
    Blank,
    /// The modem echoing the command that is being executed
    Echo,
    /// Anything else
    Other(&'a str),
}

impl<'a> Line<'a> {
    /// Classify `line`. `command` is the command currently awaiting its final
    /// result, if any, and is used to recognise echo.
    pub fn classify(line: &'a str, command: Option<&str>) -> Line<'a> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return Line::Blank;
        }

        if command.is_some_and(|cmd| cmd == trimmed) {
            return Line::Echo;
        }

        if let Some(captures) = RESULT_CODE.captures(trimmed) {
            let (Some(prefix), Some(code)) = (captures.get(0), captures.get(1)) else {
                return Line::Other(trimmed);
            };
            return Line::ResultCode {
                code: code.as_str(),
                value: &trimmed[prefix.end()..],
            };
        }

        match trimmed {
            "OK" => Line::Ok,
            "ERROR" => Line::Error,
            other => Line::Other(other),
        }
    }

    /// Whether this line ends a command
    pub fn is_final(&self) -> bool {
        matches!(self, Line::Ok | Line::Error)
    }
}

/// Own number out of a `+CNUM` value, e.g. `"","+491701234567",145`.
///
/// Returns `None` when the value does not have the expected shape.
pub fn parse_subscriber_number(value: &str) -> Option<&str> {
    let captures = SUBSCRIBER_NUMBER.captures(value)?;
    (1..=3)
        .find_map(|group| captures.get(group))
        .map(|m| m.as_str())
}

/// Caller id out of a `+CLIP` value, e.g. `"+491701234567",145,"",,"",0`
pub fn parse_caller_id(value: &str) -> Option<&str> {
    let captures = CALLER_ID.captures(value)?;
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

/// Message storage index out of a `+CMGL` value, e.g. `3,0,,24`
pub fn parse_listing_index(value: &str) -> Option<u32> {
    LISTING_INDEX
        .captures(value)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Registration status field of a `+CREG` value.
///
/// The unsolicited form is `<stat>`; the query response is `<n>,<stat>`. The
/// leading field is dropped when a comma is present.
pub fn registration_status(value: &str) -> &str {
    match value.split_once(',') {
        Some((_, rest)) => rest,
        None => value,
    }
}
