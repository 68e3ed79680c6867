// ABOUTME: Shared queue of outbound notifications fed by every modem session
// ABOUTME: A single lazily spawned worker hands them to the delivery backend, retrying with capped back-off

use crate::cancel::CancelToken;
use crate::pdu::PduFields;
use crate::session::traits::EventSink;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something worth telling the owner of a modem about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Sms {
        /// Number of the SIM that received the message
        subscriber: String,
        sender: String,
        timestamp: String,
        message: String,
    },
    Call {
        subscriber: String,
        caller: String,
        timestamp: String,
    },
}

impl Notification {
    /// Short summary line, e.g. for a mail subject
    pub fn subject(&self) -> String {
        match self {
            Notification::Sms { sender, .. } => format!("SMS from {sender}"),
            Notification::Call { caller, .. } => format!("Call from {caller}"),
        }
    }

    /// Full text including the receiving number and time
    pub fn body(&self) -> String {
        match self {
            Notification::Sms {
                subscriber,
                sender,
                timestamp,
                message,
            } => format!("To: {subscriber}\nFrom: {sender}\nDate: {timestamp}\n\n{message}"),
            Notification::Call {
                subscriber,
                caller,
                timestamp,
            } => format!("To: {subscriber}\nCaller: {caller}\nDate: {timestamp}"),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject())
    }
}

/// Failure reported by a [`Deliver`] backend
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The backend refused or could not reach its destination
    #[error("Delivery failed: {0}")]
    Rejected(String),

    #[error("Delivery error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Backend that forwards notifications, e.g. a mailer.
///
/// Called from a blocking worker thread, one notification at a time, in
/// arrival order. A failed notification is retried until it succeeds.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Back-off between delivery retries
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<Notification>,
    worker: Option<JoinHandle<()>>,
    running: bool,
}

struct Shared<D> {
    queue: Mutex<Queue>,
    backend: D,
    retry: RetryPolicy,
    cancel: CancelToken,
    runtime: Handle,
}

impl<D> Shared<D> {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle to the shared notification queue.
///
/// Every session gets a clone as its [`EventSink`]. Events are only queued
/// when they arrive; [`flush`](Outbox::flush) starts the delivery worker if
/// there is work and no worker is running yet.
pub struct Outbox<D> {
    shared: Arc<Shared<D>>,
}

impl<D> Clone for Outbox<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D> fmt::Debug for Outbox<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.shared.lock();
        f.debug_struct("Outbox")
            .field("pending", &queue.pending.len())
            .field("running", &queue.running)
            .finish()
    }
}

impl<D: Deliver> Outbox<D> {
    pub fn new(backend: D, retry: RetryPolicy, cancel: CancelToken, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                backend,
                retry,
                cancel,
                runtime,
            }),
        }
    }

    pub fn push(&self, notification: Notification) {
        debug!("Queued notification: {}", notification);
        self.shared.lock().pending.push_back(notification);
    }

    /// Notifications not yet delivered
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Start the delivery worker unless it is already running or there is
    /// nothing to deliver.
    pub fn flush(&self) {
        let mut queue = self.shared.lock();
        if queue.running || queue.pending.is_empty() || self.shared.cancel.is_cancelled() {
            return;
        }

        queue.running = true;
        let shared = Arc::clone(&self.shared);
        queue.worker = Some(self.shared.runtime.spawn_blocking(move || drain(&shared)));
    }

    /// Wait for the current worker, if any, to finish
    pub async fn join(&self) {
        let worker = self.shared.lock().worker.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Delivery worker panicked: {}", e);
            }
        }
    }
}

/// Deliver queued notifications until the queue is empty or shutdown is requested
fn drain<D: Deliver>(shared: &Shared<D>) {
    let mut backoff = shared.retry.initial;

    loop {
        let next = {
            let mut queue = shared.lock();
            match queue.pending.front() {
                Some(notification) => notification.clone(),
                None => {
                    queue.running = false;
                    return;
                }
            }
        };

        match shared.backend.deliver(&next) {
            Ok(()) => {
                info!("Delivered: {}", next);
                shared.lock().pending.pop_front();
                backoff = shared.retry.initial;
            }
            Err(e) => {
                warn!("Delivery of '{}' failed, retrying in {:?}: {}", next, backoff, e);
                if shared.cancel.wait_timeout(backoff) {
                    let mut queue = shared.lock();
                    queue.running = false;
                    warn!("Shutting down with {} undelivered notifications", queue.pending.len());
                    return;
                }
                backoff = shared.retry.next(backoff);
            }
        }
    }
}

impl<D: Deliver> EventSink for Outbox<D> {
    fn on_new_sms(&mut self, subscriber: &str, sms: &PduFields) {
        self.push(Notification::Sms {
            subscriber: subscriber.to_string(),
            sender: sms.sender.clone(),
            timestamp: sms.timestamp.clone(),
            message: sms.message.clone(),
        });
    }

    fn on_new_caller(&mut self, subscriber: &str, caller: &str, timestamp: &str) {
        self.push(Notification::Call {
            subscriber: subscriber.to_string(),
            caller: caller.to_string(),
            timestamp: timestamp.to_string(),
        });
    }

    fn flush(&mut self) {
        Outbox::flush(self);
    }
}
