//! Routes SMS and caller-id notifications from GSM modems to an outbound backend.
//!
//! The crate has two layers:
//!
//! * [`pdu`] decodes SMS-DELIVER PDUs (GSM 7-bit, UCS-2, service-centre
//!   timestamps) without any I/O.
//! * [`session`] drives one modem with AT commands over a line transport,
//!   dispatches unsolicited result codes and hands decoded events to an
//!   [`EventSink`].
//!
//! [`router`] ties them together for real hardware: it discovers serial
//! ports, runs one session thread per port and forwards every event through a
//! shared [`Outbox`].

pub mod cancel;
pub mod codec;
pub mod connection;
pub mod frame;
pub mod pdu;
pub mod router;
pub mod session;


pub use cancel::CancelToken;
pub use codec::{PduError, PduResult};
pub use connection::{Connect, LineBuffer, LineTransport, SerialConnector};
pub use pdu::{PduFields, parse_pdu};
pub use router::{Deliver, DeliveryError, Notification, Outbox, Router, RouterConfig};
pub use session::{EventSink, Session, SessionConfig, SessionError, SessionResult, Transport, TransportError};

/// Error returned by most functions.
///
/// Each layer has its own error enum; this boxed form is for callers that
/// just want to bubble any of them up, like the demo binary does.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type using the boxed [`Error`].
///
/// # Examples
///
/// Decoding a PDU listed by `AT+CMGL=4`:
///
/// ```rust
/// use sms_router::parse_pdu;
///
/// fn main() -> sms_router::Result<()> {
///     let sms = parse_pdu("0791947101670000040C91947110325476000021503090510380\
///                          05E8329BFD06")?;
///
///     assert_eq!(sms.sender, "491701234567");
///     assert_eq!(sms.timestamp, "2012-05-03T09:15:30+02:00");
///     assert_eq!(sms.message, "hello");
///     Ok(())
/// }
/// ```
///
/// Running a router that logs every notification:
///
/// ```rust,no_run
/// use sms_router::{Deliver, DeliveryError, Notification, Router, RouterConfig};
///
/// struct LogBackend;
///
/// impl Deliver for LogBackend {
///     fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
///         println!("{}\n{}", notification.subject(), notification.body());
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let config = RouterConfig::default();
///     let scanner = config.usb_scanner();
///     let router = Router::new(config, scanner, LogBackend, tokio::runtime::Handle::current());
///
///     router
///         .run(async {
///             let _ = tokio::signal::ctrl_c().await;
///         })
///         .await;
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
