// ABOUTME: Modem session module: AT command engine, dispatch of result codes and event queues
// ABOUTME: Re-exports the session type together with its traits, configuration and errors

pub mod callers;
pub mod config;
pub mod error;
pub mod modem;
pub mod traits;
pub mod types;

pub use callers::CallerTracker;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult, TransportError};
pub use modem::Session;
pub use traits::{EventSink, Transport};
pub use types::{CommandStore, NetworkRegistration, PendingCaller, PendingSms, SessionState};
