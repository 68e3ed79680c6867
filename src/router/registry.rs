// ABOUTME: Process-wide map of serial ports to the worker running a session on them
// ABOUTME: Prevents two sessions on one port and lets shutdown collect every worker for joining

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Shared port → worker map.
///
/// Cloning gives another handle to the same map. Workers remove their own
/// entry when their session ends so the port is picked up again by the next
/// discovery pass.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    workers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a worker for `port` unless one is already registered.
    ///
    /// `spawn` runs under the registry lock, so a worker that finishes
    /// immediately still deregisters after it was registered. Returns whether
    /// a worker was started.
    pub fn try_start<F>(&self, port: &str, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut workers = self.lock();
        if workers.contains_key(port) {
            return false;
        }
        workers.insert(port.to_string(), spawn());
        true
    }

    /// Drop the entry for `port`; called by the worker itself on exit
    pub fn remove(&self, port: &str) {
        self.lock().remove(port);
    }

    pub fn contains(&self, port: &str) -> bool {
        self.lock().contains_key(port)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ports with a running session, sorted
    pub fn ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = self.lock().keys().cloned().collect();
        ports.sort();
        ports
    }

    /// Remove and return every worker, for joining at shutdown
    pub fn drain(&self) -> Vec<(String, JoinHandle<()>)> {
        self.lock().drain().collect()
    }
}
