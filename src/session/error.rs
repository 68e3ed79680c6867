// ABOUTME: Error types for the serial transport and the AT command session running over it
// ABOUTME: Transport faults end a session; command and bring-up failures abort initialisation

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures of the line-oriented transport underneath a session
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the serial device (read, write, flush)
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),

    /// Opening or configuring the serial port failed
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    /// The process-wide cancel token was triggered
    #[error("Session cancelled")]
    Cancelled,

    /// No complete line arrived within the poll ceiling
    #[error("No line received within {0:?}")]
    Timeout(Duration),

    /// The device stopped producing data for good
    #[error("Stream closed")]
    Closed,
}

/// Errors that end initialisation or the steady-state loop of a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The modem answered `ERROR` to a command
    #[error("Command {0} failed")]
    CommandFailed(String),

    /// `+CPIN` reported anything other than `READY`
    #[error("SIM card is not ready (PIN status {0:?}); remove the PIN and try again")]
    PinNotReady(String),

    /// `+CNUM` did not yield an own number
    #[error("Subscriber number is empty")]
    EmptySubscriberNumber,
}

impl SessionError {
    /// Whether the session ended because shutdown was requested
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Transport(TransportError::Cancelled))
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_convert() {
        let err: SessionError = TransportError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: SessionError = TransportError::Closed.into();
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "Transport error: Stream closed");
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "unplugged");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn test_command_failure_message() {
        let err = SessionError::CommandFailed("AT+CMGF=0".to_string());
        assert_eq!(err.to_string(), "Command AT+CMGF=0 failed");
    }
}
