// ABOUTME: Plain data owned by a modem session: latched result values, event queues and states
// ABOUTME: Also maps +CREG registration codes to readable labels

use num_enum::TryFromPrimitive;
use std::collections::HashMap;
use std::fmt;

/// Latest value seen for each result code, e.g. `+CPIN` → `READY`
#[derive(Debug, Clone, Default)]
pub struct CommandStore {
    values: HashMap<String, String>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `code`, replacing any earlier value
    pub fn set(&mut self, code: &str, value: impl Into<String>) {
        self.values.insert(code.to_string(), value.into());
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.values.get(code).map(String::as_str)
    }
}

/// A `+CMGL` listing entry waiting to be decoded and deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSms {
    /// Value of the `+CMGL` line, starting with the storage index
    pub listing: String,
    /// Hex PDU from the line that followed it
    pub pdu: String,
}

/// A caller id waiting to be handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCaller {
    pub caller: String,
    pub timestamp: String,
}

/// Lifecycle of a modem session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Initializing,
    Ready,
    ExecutingCommand,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::ExecutingCommand => "executing command",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// `<stat>` of `+CREG` (3GPP TS 27.007 7.2). Only the first three values get a label.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NetworkRegistration {
    Disconnected = 0,
    Connected = 1,
    Searching = 2,
}

impl NetworkRegistration {
    pub fn label(self) -> &'static str {
        match self {
            NetworkRegistration::Disconnected => "Disconnected",
            NetworkRegistration::Connected => "Connected",
            NetworkRegistration::Searching => "Searching...",
        }
    }

    /// Readable form of a raw status; unknown codes pass through unchanged
    pub fn describe(status: &str) -> String {
        status
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(|code| NetworkRegistration::try_from(code).ok())
            .map(|reg| reg.label().to_string())
            .unwrap_or_else(|| status.to_string())
    }
}
