//! Session-scoped sighting dedup.

use std::collections::HashSet;

/// Tracks which device keys have already been processed this session.
///
/// This is the sole mechanism preventing duplicate alerts for a device that
/// stays connected across poll passes. State is in-memory only; a restart
/// re-arms alerting for everything still attached. There is no disconnect
/// detection, so an unplug/replug within one session is not re-processed.
#[derive(Debug, Default)]
pub struct SightingTracker {
    seen: HashSet<String>,
}

impl SightingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting. Returns true exactly once per key; every repeat
    /// within the session returns false until `reset` is called.
    pub fn record_if_new(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }

    /// Number of distinct devices sighted this session.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget all sightings, re-arming alerts for every key.
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
