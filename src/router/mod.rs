// ABOUTME: Supervisor that discovers modems, runs one session thread per port and owns the shared outbox
// ABOUTME: Periodic discovery on a tokio interval; shutdown cancels every session and waits within a grace period

pub mod discovery;
pub mod outbox;
pub mod registry;

pub use discovery::{PortDiscovery, StaticPorts, UsbPortScanner};
pub use outbox::{Deliver, DeliveryError, Notification, Outbox, RetryPolicy};
pub use registry::SessionRegistry;

use crate::cancel::CancelToken;
use crate::connection::{Connect, SerialConnector};
use crate::session::{Session, SessionConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

/// Configuration for the router
///
/// # Example
///
/// ```rust
/// use sms_router::router::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::default()
///     .with_discovery_interval(Duration::from_secs(5))
///     .with_usb_ids(0x0403, 0x6001);
/// assert_eq!(config.usb_vendor_id, 0x0403);
/// ```
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Time between discovery passes (default: 10 seconds)
    pub discovery_interval: Duration,

    /// USB vendor id of the modem's serial bridge (default: 0x1A86, WCH)
    pub usb_vendor_id: u16,

    /// USB product id of the modem's serial bridge (default: 0x7523, CH340)
    pub usb_product_id: u16,

    /// First wait after a failed delivery (default: 30 seconds)
    pub delivery_backoff_initial: Duration,

    /// Longest wait between delivery retries (default: 30 minutes)
    pub delivery_backoff_max: Duration,

    /// How long shutdown waits for sessions and the delivery worker (default: 30 seconds)
    pub shutdown_grace: Duration,

    /// Settings passed to every session
    pub session: SessionConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(10),
            usb_vendor_id: 0x1A86,
            usb_product_id: 0x7523,
            delivery_backoff_initial: Duration::from_secs(30),
            delivery_backoff_max: Duration::from_secs(30 * 60),
            shutdown_grace: Duration::from_secs(30),
            session: SessionConfig::default(),
        }
    }
}

impl RouterConfig {
    pub fn with_discovery_interval(mut self, discovery_interval: Duration) -> Self {
        self.discovery_interval = discovery_interval;
        self
    }

    pub fn with_usb_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.usb_vendor_id = vendor_id;
        self.usb_product_id = product_id;
        self
    }

    pub fn with_delivery_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.delivery_backoff_initial = initial;
        self.delivery_backoff_max = max.max(initial);
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial: self.delivery_backoff_initial,
            max: self.delivery_backoff_max,
        }
    }

    /// Scanner for the configured USB ids
    pub fn usb_scanner(&self) -> UsbPortScanner {
        UsbPortScanner::new(self.usb_vendor_id, self.usb_product_id)
    }
}

/// Runs a modem session for every discovered port.
///
/// Each session gets its own blocking thread, a clone of the shared
/// [`Outbox`] as its event sink, and the router's cancel token.
pub struct Router<D, P, C = SerialConnector> {
    config: RouterConfig,
    discovery: P,
    connector: Arc<C>,
    outbox: Outbox<D>,
    registry: SessionRegistry,
    cancel: CancelToken,
    runtime: Handle,
}

impl<D: Deliver, P: PortDiscovery> Router<D, P, SerialConnector> {
    /// Router that opens discovered ports as serial devices
    pub fn new(config: RouterConfig, discovery: P, backend: D, runtime: Handle) -> Self {
        Self::with_connector(config, discovery, backend, SerialConnector, runtime)
    }
}

impl<D: Deliver, P: PortDiscovery, C: Connect> Router<D, P, C> {
    pub fn with_connector(
        config: RouterConfig,
        discovery: P,
        backend: D,
        connector: C,
        runtime: Handle,
    ) -> Self {
        let cancel = CancelToken::new();
        let outbox = Outbox::new(backend, config.retry_policy(), cancel.clone(), runtime.clone());

        Self {
            config,
            discovery,
            connector: Arc::new(connector),
            outbox,
            registry: SessionRegistry::new(),
            cancel,
            runtime,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn outbox(&self) -> &Outbox<D> {
        &self.outbox
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// One discovery pass; returns the number of sessions started
    pub fn discover(&mut self) -> usize {
        let ports = match self.discovery.discover() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Port discovery failed: {}", e);
                return 0;
            }
        };

        ports
            .iter()
            .filter(|port| self.start_session(port))
            .count()
    }

    fn start_session(&self, port: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        self.registry.try_start(port, || {
            let port = port.to_string();
            let connector = Arc::clone(&self.connector);
            let config = self.config.session.clone();
            let cancel = self.cancel.clone();
            let outbox = self.outbox.clone();
            let registry = self.registry.clone();

            info!(port = %port, "Device found");
            self.runtime.spawn_blocking(move || {
                run_port(&port, connector.as_ref(), &config, cancel, outbox);
                registry.remove(&port);
                debug!(port = %port, "Session worker finished");
            })
        })
    }

    /// Discover on every tick until `shutdown` resolves, then shut down
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.config.discovery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.discover();
                }
            }
        }

        self.shutdown().await;
    }

    /// Cancel every session and wait up to the grace period for them and
    /// for the delivery worker
    pub async fn shutdown(self) {
        info!("Shutting down, waiting up to {:?}", self.config.shutdown_grace);
        self.cancel.cancel();

        let workers = self.registry.drain();
        let outbox = self.outbox.clone();
        let join_all = async move {
            for (port, worker) in workers {
                if let Err(e) = worker.await {
                    warn!(port = %port, "Session worker panicked: {}", e);
                }
            }
            outbox.join().await;
        };

        if timeout(self.config.shutdown_grace, join_all).await.is_err() {
            warn!("Workers still running after {:?}", self.config.shutdown_grace);
        }
    }
}

/// Open `port` and run a session on it until it ends
fn run_port<D: Deliver, C: Connect>(
    port: &str,
    connector: &C,
    config: &SessionConfig,
    cancel: CancelToken,
    outbox: Outbox<D>,
) {
    let transport = match connector.connect(port, config, cancel) {
        Ok(transport) => transport,
        Err(e) => {
            warn!(port, "Cannot open device: {}", e);
            return;
        }
    };

    let mut session = Session::new(port, transport, outbox, config);
    if let Err(e) = session.run() {
        debug!(port, "Session exited with error: {}", e);
    }
}
