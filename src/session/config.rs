// ABOUTME: Tunables for a single modem session and its serial transport
// ABOUTME: Builder-style configuration with defaults matching a SIM800-class modem on a CH340 adapter

use std::time::Duration;

/// Configuration for a modem session
///
/// Controls how long the transport waits for a line before giving up, how
/// long a caller id is suppressed after it was reported, and how the serial
/// port is opened.
///
/// # Example
///
/// ```rust
/// use sms_router::session::SessionConfig;
/// use std::time::Duration;
///
/// // 100 ms polls, 150 of them per line, 60 s caller de-duplication
/// let config = SessionConfig::default();
///
/// let config = SessionConfig::default()
///     .with_poll_interval(Duration::from_millis(50))
///     .with_max_polls(40)
///     .with_baud_rate(115_200);
/// assert_eq!(config.line_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Read timeout of a single transport poll (default: 100 ms)
    ///
    /// The cancel token is checked between polls, so this bounds how long a
    /// shutdown request can go unnoticed.
    pub poll_interval: Duration,

    /// Polls without a complete line before a read reports a timeout (default: 150)
    pub max_polls: u32,

    /// How long a repeated caller id is suppressed (default: 60 seconds)
    pub caller_dedup_window: Duration,

    /// Bytes requested from the device per poll (default: 256)
    pub read_chunk: usize,

    /// Serial line speed (default: 9600)
    pub baud_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 150,
            caller_dedup_window: Duration::from_secs(60),
            read_chunk: 256,
            baud_rate: 9600,
        }
    }
}

impl SessionConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    pub fn with_caller_dedup_window(mut self, window: Duration) -> Self {
        self.caller_dedup_window = window;
        self
    }

    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Longest a single `read_line` may block
    pub fn line_timeout(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}
