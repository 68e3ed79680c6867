// ABOUTME: AT command engine and event loop for one GSM modem on one serial port
// ABOUTME: Brings the device up, dispatches unsolicited result codes and drains queued SMS and caller events

use crate::frame::{Line, parse_caller_id, parse_listing_index, parse_subscriber_number, registration_status};
use crate::pdu::parse_pdu;
use crate::session::callers::CallerTracker;
use crate::session::config::SessionConfig;
use crate::session::error::{SessionError, SessionResult, TransportError};
use crate::session::traits::{EventSink, Transport};
use crate::session::types::{CommandStore, NetworkRegistration, PendingCaller, PendingSms, SessionState};
use chrono::{Local, SecondsFormat};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

const PIN_STATUS: &str = "+CPIN";
const SUBSCRIBER_NUMBER: &str = "+CNUM";
const LIST_ALL_MESSAGES: &str = "AT+CMGL=4";

/// A modem session.
///
/// Owns the transport to the device and the sink that receives decoded
/// events. All methods block on the transport; a session is meant to run on
/// its own thread via [`run`](Session::run).
///
/// ```text
/// Idle → Initializing → Ready ⇄ ExecutingCommand → Closed
/// ```
#[derive(Debug)]
pub struct Session<T, S> {
    port: String,
    transport: T,
    sink: S,
    state: SessionState,
    store: CommandStore,
    pending_sms: VecDeque<PendingSms>,
    pending_callers: VecDeque<PendingCaller>,
    callers: CallerTracker,
    needs_listing: bool,
}

impl<T: Transport, S: EventSink> Session<T, S> {
    pub fn new(port: impl Into<String>, transport: T, sink: S, config: &SessionConfig) -> Self {
        Self {
            port: port.into(),
            transport,
            sink,
            state: SessionState::Idle,
            store: CommandStore::new(),
            pending_sms: VecDeque::new(),
            pending_callers: VecDeque::new(),
            callers: CallerTracker::new(config.caller_dedup_window),
            needs_listing: false,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Own number reported by `AT+CNUM`, once initialisation got that far
    pub fn subscriber_number(&self) -> Option<&str> {
        self.store.get(SUBSCRIBER_NUMBER)
    }

    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// SMS listings received but not yet processed, oldest first
    pub fn pending_sms(&self) -> impl Iterator<Item = &PendingSms> {
        self.pending_sms.iter()
    }

    /// Caller ids received but not yet handed to the sink, oldest first
    pub fn pending_callers(&self) -> impl Iterator<Item = &PendingCaller> {
        self.pending_callers.iter()
    }

    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }

    /// Write `command` and consume lines until its final result.
    ///
    /// Result codes seen on the way are dispatched like unsolicited ones. Echo
    /// and blank lines are skipped; anything unrecognised is logged and the
    /// wait continues.
    pub fn execute_command(&mut self, command: &str) -> SessionResult<()> {
        let previous = self.state;
        self.state = SessionState::ExecutingCommand;
        let result = self.exchange(command);
        self.state = previous;
        result
    }

    fn exchange(&mut self, command: &str) -> SessionResult<()> {
        self.transport.write_line(command)?;

        loop {
            let line = self.transport.read_line()?;

            match Line::classify(&line, Some(command)) {
                Line::Blank | Line::Echo => {}
                Line::ResultCode { code, value } => self.dispatch(code, value)?,
                Line::Ok => return Ok(()),
                Line::Error => return Err(SessionError::CommandFailed(command.to_string())),
                Line::Other(other) => warn!("Unhandled return: {}", other),
            }
        }
    }

    /// Act on one `+CODE: value` line
    pub fn dispatch(&mut self, code: &str, value: &str) -> SessionResult<()> {
        self.dispatch_at(code, value, Instant::now())
    }

    pub(crate) fn dispatch_at(&mut self, code: &str, value: &str, now: Instant) -> SessionResult<()> {
        match code {
            PIN_STATUS => self.store.set(code, value),
            SUBSCRIBER_NUMBER => {
                if let Some(number) = parse_subscriber_number(value) {
                    self.store.set(code, number);
                }
            }
            "+CMGL" => {
                info!("New SMS!");
                let pdu = match self.transport.read_line() {
                    Ok(pdu) => pdu,
                    Err(TransportError::Timeout(waited)) => {
                        warn!("No PDU within {:?} after listing {}, dropping it", waited, value);
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };
                self.pending_sms.push_back(PendingSms {
                    listing: value.to_string(),
                    pdu,
                });
            }
            "+CREG" => {
                let status = NetworkRegistration::describe(registration_status(value));
                info!("Network state change: {}", status);
            }
            "+CMTI" => self.needs_listing = true,
            "+CRING" => info!("Incoming call: {}", value),
            "+CLIP" => match parse_caller_id(value) {
                Some(caller) => {
                    if self.callers.observe(caller, now) {
                        self.pending_callers.push_back(PendingCaller {
                            caller: caller.to_string(),
                            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                        });
                    }
                    info!("Caller ID: {}", caller);
                }
                None => info!("Caller ID: {}", value),
            },
            _ => warn!("Unhandled command: {} with value: {}", code, value),
        }

        Ok(())
    }

    /// Decode and delete every listed SMS, then report every queued caller.
    ///
    /// Listings without a storage index are dropped. A PDU that fails to
    /// decode is not reported but is still deleted from the modem; a failed
    /// delete aborts with an error.
    pub fn process_pending_events(&mut self) -> SessionResult<()> {
        while let Some(entry) = self.pending_sms.pop_front() {
            let Some(index) = parse_listing_index(&entry.listing) else {
                debug!("Ignoring SMS listing without index: {}", entry.listing);
                continue;
            };

            match parse_pdu(&entry.pdu) {
                Ok(sms) => {
                    info!(index, from = %sms.sender, "Received SMS");
                    let subscriber = self.store.get(SUBSCRIBER_NUMBER).unwrap_or_default();
                    self.sink.on_new_sms(subscriber, &sms);
                }
                Err(e) => warn!(index, "Dropping undecodable SMS: {}", e),
            }

            if let Err(e) = self.execute_command(&format!("AT+CMGD={index}")) {
                error!("CMGD (Delete SMS) command failed: {}", e);
                return Err(e);
            }
        }

        while let Some(entry) = self.pending_callers.pop_front() {
            let subscriber = self.store.get(SUBSCRIBER_NUMBER).unwrap_or_default();
            self.sink.on_new_caller(subscriber, &entry.caller, &entry.timestamp);
        }

        Ok(())
    }

    /// Bring the modem into PDU mode with all notifications enabled.
    ///
    /// SMS already stored on the SIM are processed on the way. Any failure
    /// leaves the session `Closed`.
    pub fn initialize(&mut self) -> SessionResult<()> {
        self.state = SessionState::Initializing;

        match self.bring_up() {
            Ok(()) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> SessionResult<()> {
        self.step("AT", "AT start command")?;
        self.step("ATE0", "Echo off command")?;
        self.step("AT+CPIN?", "PIN command")?;

        let pin = self.store.get(PIN_STATUS).unwrap_or_default();
        if pin != "READY" {
            let err = SessionError::PinNotReady(pin.to_string());
            error!("{}", err);
            return Err(err);
        }

        self.step("AT+CMGF=0", "Set PDU mode command")?;
        self.step("AT+CRC=1", "Set extended ring mode command")?;
        self.step("AT+CNUM", "Get own number command")?;

        match self.subscriber_number() {
            Some(number) if !number.is_empty() => info!("Phone number is {}", number),
            _ => {
                error!("Subscriber number is empty!");
                return Err(SessionError::EmptySubscriberNumber);
            }
        }

        info!("Processing SMS on SIM card...");
        self.step(LIST_ALL_MESSAGES, "CMGL (List SMS) command")?;
        self.process_pending_events()?;

        self.step("AT+CREG=1", "Enable network registration notification")?;
        self.step("AT+CLIP=1", "Enable caller identification notification")?;
        self.step("AT+CNMI=2", "Enable SMS notification")?;
        self.step("AT+CREG?", "Get network registration status")?;

        Ok(())
    }

    fn step(&mut self, command: &str, what: &str) -> SessionResult<()> {
        self.execute_command(command).inspect_err(|e| {
            error!("{} failed: {}", what, e);
        })
    }

    /// Steady-state loop.
    ///
    /// Probes the modem with `AT`, then waits for unsolicited lines, listing
    /// SMS whenever `+CMTI` announced one and draining the event queues
    /// before every read. Returns `Ok` when the line stays quiet for a full
    /// read timeout so the caller can probe again; returns an error when the
    /// probe or the transport fails.
    pub fn perform_loop(&mut self) -> SessionResult<()> {
        self.execute_command("AT")?;

        loop {
            if std::mem::take(&mut self.needs_listing) {
                self.step(LIST_ALL_MESSAGES, "CMGL (List SMS) command")?;
            }

            self.process_pending_events()?;
            self.sink.flush();

            let line = match self.transport.read_line() {
                Ok(line) => line,
                Err(TransportError::Timeout(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            match Line::classify(&line, None) {
                Line::Blank => {}
                Line::ResultCode { code, value } => self.dispatch(code, value)?,
                _ => warn!("Unhandled unsolicited event: {}", line),
            }
        }
    }

    /// Initialise, then loop until the transport fails or shutdown is requested.
    ///
    /// The sink is flushed on the way out so that events queued before a
    /// failure still get delivered. Cancellation is a clean exit and returns
    /// `Ok`.
    pub fn run(&mut self) -> SessionResult<()> {
        let span = info_span!("modem", port = %self.port);
        let _enter = span.enter();

        info!("Starting session");
        let result = self.initialize().and_then(|()| self.serve());
        self.state = SessionState::Closed;
        self.sink.flush();

        match result {
            Err(e) if e.is_cancelled() => {
                info!("Session stopped");
                Ok(())
            }
            Err(e) => {
                error!("Session ended: {}", e);
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    fn serve(&mut self) -> SessionResult<()> {
        loop {
            self.perform_loop()?;
            debug!("Line quiet, probing modem again");
        }
    }
}
