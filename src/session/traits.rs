// ABOUTME: Seams between a modem session and its collaborators
// ABOUTME: The line transport it drives and the sink that receives decoded SMS and caller events

use crate::pdu::PduFields;
use crate::session::error::TransportError;

/// Line-oriented, cancellable byte stream to a modem.
///
/// `read_line` never returns an empty line. It blocks for at most the
/// implementation's poll ceiling and reports [`TransportError::Timeout`] when
/// nothing arrived, or [`TransportError::Cancelled`] once shutdown is requested.
pub trait Transport {
    /// Write `line` followed by CR LF
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Next non-empty line, without its terminator
    fn read_line(&mut self) -> Result<String, TransportError>;
}

/// Receiver of events produced by a session.
///
/// `subscriber` is the session's own number as reported by `AT+CNUM`.
pub trait EventSink {
    /// A stored SMS was listed and decoded
    fn on_new_sms(&mut self, subscriber: &str, sms: &PduFields);

    /// A caller was identified by `+CLIP`; `timestamp` is local RFC 3339
    fn on_new_caller(&mut self, subscriber: &str, caller: &str, timestamp: &str);

    /// Called once per loop iteration so queued notifications can be pushed on
    fn flush(&mut self) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).write_line(line)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        (**self).read_line()
    }
}
