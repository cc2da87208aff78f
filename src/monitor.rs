//! The monitoring loop: poll, normalize, classify, alert.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use log::{debug, error, info, warn};

use crate::allowlist::AllowList;
use crate::csvio;
use crate::identity::DeviceIdentity;
use crate::notify::Notifier;
use crate::source::DeviceSource;
use crate::tracker::SightingTracker;

/// Column order of the unauthorized-device event log.
pub const EVENT_LOG_COLUMNS: [&str; 6] = [
    "timestamp",
    "vendor_id",
    "product_id",
    "device_name",
    "host",
    "observer",
];

/// A persisted record of an unauthorized device sighting.
///
/// Created exactly once per first-seen unauthorized device in a session,
/// appended to the event log, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    pub timestamp: String,
    pub vendor_id: String,
    pub product_id: String,
    pub device_name: String,
    pub host: String,
    pub observer: String,
}

impl UnauthorizedEvent {
    /// Build an event for a device sighted right now on this host.
    pub fn sighted(identity: &DeviceIdentity) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            vendor_id: identity.vendor_id.clone(),
            product_id: identity.product_id.clone(),
            device_name: identity.display_name(),
            host: host_identifier(),
            observer: observer_identifier(),
        }
    }
}

fn host_identifier() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

fn observer_identifier() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// The event log could not be appended to.
#[derive(Debug)]
pub struct EventLogError {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for EventLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not append to event log {}: {}",
            self.path.display(),
            self.reason
        )
    }
}

impl std::error::Error for EventLogError {}

/// Append-only CSV log of unauthorized sightings.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, writing the header only when creating the file.
    pub fn append(&self, event: &UnauthorizedEvent) -> Result<(), EventLogError> {
        let log_err = |reason: String| EventLogError {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| log_err(e.to_string()))?;
            }
        }

        let is_new = !self.path.exists();
        let mut payload = String::new();
        if is_new {
            payload.push_str(&csvio::format_record(&EVENT_LOG_COLUMNS));
            payload.push('\n');
        }
        payload.push_str(&csvio::format_record(&[
            &event.timestamp,
            &event.vendor_id,
            &event.product_id,
            &event.device_name,
            &event.host,
            &event.observer,
        ]));
        payload.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| log_err(e.to_string()))?;
        file.write_all(payload.as_bytes())
            .map_err(|e| log_err(e.to_string()))?;
        file.flush().map_err(|e| log_err(e.to_string()))?;

        Ok(())
    }
}

/// Settings for one monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Time between poll passes.
    pub poll_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Counts from a single poll pass, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Devices with a usable identity this pass.
    pub devices_seen: usize,
    /// Devices not sighted earlier in the session.
    pub new_devices: usize,
    pub authorized: usize,
    pub unauthorized: usize,
}

/// The monitoring loop.
///
/// Owns the allow-list, the sighting tracker, and the event log for the
/// duration of a session; nothing mutates them while a pass is in progress.
/// A single instance runs per host, entirely on the calling thread.
pub struct Monitor<S: DeviceSource> {
    source: S,
    allow_list: AllowList,
    tracker: SightingTracker,
    event_log: EventLog,
    notifier: Option<Box<dyn Notifier>>,
    options: MonitorOptions,
}

impl<S: DeviceSource> Monitor<S> {
    pub fn new(
        source: S,
        allow_list: AllowList,
        event_log: EventLog,
        notifier: Option<Box<dyn Notifier>>,
        options: MonitorOptions,
    ) -> Self {
        Self {
            source,
            allow_list,
            tracker: SightingTracker::new(),
            event_log,
            notifier,
            options,
        }
    }

    /// Run until `running` is cleared.
    ///
    /// Cancellation is observed within one poll interval, and the pass in
    /// progress always completes before the loop exits; no device list is
    /// ever abandoned half-processed.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "monitoring against {} allow-listed device(s), polling every {}s",
            self.allow_list.len(),
            self.options.poll_interval.as_secs()
        );
        if self.notifier.is_none() {
            warn!("no email configuration present; alerts will be logged only");
        }

        while running.load(Ordering::SeqCst) {
            let summary = self.run_pass();
            if summary.new_devices > 0 {
                debug!(
                    "pass complete: {} device(s), {} new, {} authorized, {} unauthorized",
                    summary.devices_seen,
                    summary.new_devices,
                    summary.authorized,
                    summary.unauthorized
                );
            }
            self.sleep_until_next_pass(running);
        }

        info!(
            "monitoring stopped after sighting {} distinct device(s)",
            self.tracker.len()
        );
    }

    /// One full pass over the currently connected devices.
    pub fn run_pass(&mut self) -> PassSummary {
        let mut summary = PassSummary::default();

        let records = match self.source.enumerate() {
            Ok(records) => records,
            Err(e) => {
                // Transient platform failure: zero devices this pass,
                // retried on the next interval.
                warn!("device enumeration failed: {e}");
                return summary;
            }
        };

        for record in &records {
            let Some(identity) = DeviceIdentity::from_raw(record) else {
                debug!("dropping device record without a usable vendor/product id pair");
                continue;
            };
            summary.devices_seen += 1;

            let key = identity.key();
            if !self.tracker.record_if_new(&key) {
                continue;
            }
            summary.new_devices += 1;

            if self.allow_list.is_authorized(&identity) {
                summary.authorized += 1;
                info!("authorized device detected: {} ({key})", identity.display_name());
            } else {
                summary.unauthorized += 1;
                self.handle_unauthorized(&identity, &key);
            }
        }

        summary
    }

    /// Persist the event and deliver the alert independently: a failure in
    /// one must not suppress the other, and neither stops the loop.
    fn handle_unauthorized(&mut self, identity: &DeviceIdentity, key: &str) {
        warn!(
            "ALERT: unauthorized device detected: {} ({key})",
            identity.display_name()
        );
        let event = UnauthorizedEvent::sighted(identity);

        if let Err(e) = self.event_log.append(&event) {
            error!("{e}");
        }

        if let Some(notifier) = &self.notifier {
            match notifier.notify(&event) {
                Ok(()) => info!("alert notification sent for {key}"),
                Err(e) => error!("alert notification failed for {key}: {e}"),
            }
        }
    }

    /// Cooperative sleep in short slices so a cancellation request is
    /// honored promptly without abandoning a pass.
    fn sleep_until_next_pass(&self, running: &AtomicBool) {
        let deadline = Instant::now() + self.options.poll_interval;
        while running.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(Duration::from_millis(100)));
        }
    }
}
