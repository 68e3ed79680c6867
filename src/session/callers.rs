// ABOUTME: Suppresses repeated +CLIP reports for the same ringing call
// ABOUTME: A caller is reported again only if it changed or the window since its last sighting elapsed

use std::time::{Duration, Instant};

/// Most recent caller and when it was last seen
#[derive(Debug, Clone)]
pub struct CallerTracker {
    window: Duration,
    recent: Option<(String, Instant)>,
}

impl CallerTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: None,
        }
    }

    /// Record a sighting of `caller` at `now`.
    ///
    /// Returns `true` if this sighting should produce a caller event. The
    /// last-seen caller and time are updated either way, so a phone that keeps
    /// ringing is reported once per call.
    pub fn observe(&mut self, caller: &str, now: Instant) -> bool {
        let fresh = match &self.recent {
            Some((last, seen)) => {
                last != caller || now.saturating_duration_since(*seen) > self.window
            }
            None => true,
        };

        self.recent = Some((caller.to_string(), now));
        fresh
    }
}
