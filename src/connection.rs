// ABOUTME: Provides the serial line transport a modem session talks through
// ABOUTME: Buffers partial reads into CR/LF separated lines and polls with cancellation between reads

use crate::cancel::CancelToken;
use crate::session::config::SessionConfig;
use crate::session::error::TransportError;
use crate::session::traits::Transport;
use bytes::{Buf, BytesMut};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::debug;

fn is_terminator(byte: &u8) -> bool {
    matches!(byte, b'\r' | b'\n')
}

/// Accumulates raw bytes and splits them into lines.
///
/// Any run of `\r` and `\n` is a single separator and empty segments are
/// never returned, so `"\r\nOK\r\n\r\n"` yields exactly one line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Split off the next complete line, if the buffer holds one.
    ///
    /// Bytes after the terminator run stay buffered for the next call.
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(is_terminator)?;
            let line = self.buffer.split_to(end);

            let run = self.buffer.iter().take_while(|b| is_terminator(b)).count();
            self.buffer.advance(run);

            if !line.is_empty() {
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
        }
    }

    /// Bytes of an unterminated line still waiting for its end
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// [`Transport`] over any blocking byte stream, usually a serial port.
///
/// Each `read_line` performs at most `max_polls` reads of `read_chunk` bytes,
/// checking the cancel token before every one of them.
#[derive(Debug)]
pub struct LineTransport<S> {
    stream: S,
    buffer: LineBuffer,
    cancel: CancelToken,
    chunk: Vec<u8>,
    poll_interval: Duration,
    max_polls: u32,
}

impl<S: Read + Write> LineTransport<S> {
    pub fn new(stream: S, config: &SessionConfig, cancel: CancelToken) -> Self {
        Self {
            stream,
            buffer: LineBuffer::new(),
            cancel,
            chunk: vec![0; config.read_chunk.max(1)],
            poll_interval: config.poll_interval,
            max_polls: config.max_polls.max(1),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// One bounded read into the line buffer
    fn poll(&mut self) -> Result<(), TransportError> {
        match self.stream.read(&mut self.chunk) {
            Ok(0) => {
                // Nothing available; sleep out the poll without blocking shutdown
                if self.cancel.wait_timeout(self.poll_interval) {
                    return Err(TransportError::Cancelled);
                }
                Ok(())
            }
            Ok(n) => {
                self.buffer.extend(&self.chunk[..n]);
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof | io::ErrorKind::NotConnected
                ) =>
            {
                Err(TransportError::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl LineTransport<Box<dyn SerialPort>> {
    /// Open `port` at the configured speed, 8N1 without flow control.
    ///
    /// The port's read timeout is the poll interval, so a read returns at
    /// least that often even when the modem is silent.
    pub fn open(port: &str, config: &SessionConfig, cancel: CancelToken) -> Result<Self, TransportError> {
        let serial = serialport::new(port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.poll_interval)
            .open()?;

        debug!(port, baud = config.baud_rate, "opened serial port");
        Ok(Self::new(serial, config, cancel))
    }
}

/// Opens the transport for a discovered port
pub trait Connect: Send + Sync + 'static {
    type Transport: Transport + Send + 'static;

    fn connect(
        &self,
        port: &str,
        config: &SessionConfig,
        cancel: CancelToken,
    ) -> Result<Self::Transport, TransportError>;
}

/// [`Connect`] through the operating system's serial driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connect for SerialConnector {
    type Transport = LineTransport<Box<dyn SerialPort>>;

    fn connect(
        &self,
        port: &str,
        config: &SessionConfig,
        cancel: CancelToken,
    ) -> Result<Self::Transport, TransportError> {
        LineTransport::open(port, config, cancel)
    }
}

impl<S: Read + Write> Transport for LineTransport<S> {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        debug!(">> {}", line);
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\r\n")?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        for _ in 0..self.max_polls {
            if let Some(line) = self.buffer.next_line() {
                debug!("<< {}", line);
                return Ok(line);
            }

            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            self.poll()?;
        }

        match self.buffer.next_line() {
            Some(line) => {
                debug!("<< {}", line);
                Ok(line)
            }
            None => Err(TransportError::Timeout(self.poll_interval * self.max_polls)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Byte stream that hands out pre-recorded read results and keeps writes
    #[derive(Default)]
    struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                reads: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn fast_config() -> SessionConfig {
        SessionConfig::default()
            .with_poll_interval(Duration::from_millis(1))
            .with_max_polls(5)
    }

    fn transport(stream: ScriptedStream) -> LineTransport<ScriptedStream> {
        LineTransport::new(stream, &fast_config(), CancelToken::new())
    }

    #[test]
    fn test_buffer_splits_on_any_terminator_run() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"\r\nOK\r\n\r\n+CMTI: \"SM\",1\rAT\n");
        assert_eq!(buffer.next_line().as_deref(), Some("OK"));
        assert_eq!(buffer.next_line().as_deref(), Some("+CMTI: \"SM\",1"));
        assert_eq!(buffer.next_line().as_deref(), Some("AT"));
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_buffer_keeps_partial_line() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"+CPIN: RE");
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending(), 9);

        buffer.extend(b"ADY\r");
        assert_eq!(buffer.next_line().as_deref(), Some("+CPIN: READY"));

        // The LF of the split CRLF arrives with the next chunk
        buffer.extend(b"\nOK\r\n");
        assert_eq!(buffer.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_buffer_never_yields_empty_lines() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"\r\n\r\n\n\r");
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_read_line_across_chunks() {
        let stream = ScriptedStream::with_chunks(&[b"\r\n+CP", b"IN: READY\r", b"\nOK\r\n"]);
        let mut transport = transport(stream);
        assert_eq!(transport.read_line().unwrap(), "+CPIN: READY");
        assert_eq!(transport.read_line().unwrap(), "OK");
    }

    #[test]
    fn test_read_line_respects_chunk_size() {
        let stream = ScriptedStream::with_chunks(&[b"0791947101670000\r\n"]);
        let config = fast_config().with_read_chunk(4).with_max_polls(10);
        let mut transport = LineTransport::new(stream, &config, CancelToken::new());
        assert_eq!(transport.read_line().unwrap(), "0791947101670000");
    }

    #[test]
    fn test_read_line_times_out_when_quiet() {
        let mut transport = transport(ScriptedStream::with_chunks(&[b"+CPIN"]));
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Timeout(_))
        ));
    }

    #[test]
    fn test_read_line_observes_cancellation() {
        let cancel = CancelToken::new();
        let mut transport =
            LineTransport::new(ScriptedStream::default(), &fast_config(), cancel.clone());
        cancel.cancel();
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Cancelled)
        ));
        assert!(matches!(
            transport.write_line("AT"),
            Err(TransportError::Cancelled)
        ));
    }

    #[test]
    fn test_read_line_reports_hard_errors() {
        let stream = ScriptedStream {
            reads: VecDeque::from([Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))]),
            written: Vec::new(),
        };
        assert!(matches!(
            transport(stream).read_line(),
            Err(TransportError::Closed)
        ));

        let stream = ScriptedStream {
            reads: VecDeque::from([Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))]),
            written: Vec::new(),
        };
        assert!(matches!(
            transport(stream).read_line(),
            Err(TransportError::Io(_))
        ));
    }

    #[test]
    fn test_write_line_appends_crlf() {
        let mut transport = transport(ScriptedStream::default());
        transport.write_line("AT+CMGF=0").unwrap();
        transport.write_line("AT").unwrap();
        assert_eq!(transport.get_ref().written, b"AT+CMGF=0\r\nAT\r\n");
    }
}
