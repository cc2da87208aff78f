//! USB Sentry - allow-list based USB device authorization monitoring.
//!
//! Polls the host for currently attached USB devices, classifies each
//! against a CSV allow-list, and raises an alert (event-log entry + email)
//! the first time an unauthorized device is sighted in a session. A
//! companion interactive flow registers a connected device into the
//! allow-list.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          USB Sentry                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌─────────┐  ┌─────────┐  │
//! │  │   Source   │──▶│  Identity  │──▶│ Tracker │─▶│ Matcher │  │
//! │  │ (platform) │   │ normalizer │   │ (dedup) │  │         │  │
//! │  └────────────┘   └────────────┘   └─────────┘  └────┬────┘  │
//! │                                                      │       │
//! │                                     ┌──────────┐  ┌──▼────┐  │
//! │                                     │ Notifier │◀─│ Event │  │
//! │                                     │  (SMTP)  │  │  log  │  │
//! │                                     └──────────┘  └───────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are normalized to lowercase hex exactly once, at ingestion;
//! the matching key is the `(vendor_id, product_id)` pair, and serial
//! numbers are captured for audit only.
//!
//! # Example
//!
//! ```no_run
//! use usb_sentry::{AllowList, AllowListStore, DeviceIdentity, DeviceSource, PlatformSource};
//!
//! let store = AllowListStore::new("authorized_usb.csv");
//! let allow_list = AllowList::new(store.load().expect("readable allow-list"));
//!
//! for record in PlatformSource::new().enumerate().expect("enumeration") {
//!     if let Some(identity) = DeviceIdentity::from_raw(&record) {
//!         println!("{}: {}", identity.key(), allow_list.is_authorized(&identity));
//!     }
//! }
//! ```

pub mod allowlist;
pub mod config;
pub mod csvio;
pub mod identity;
pub mod monitor;
pub mod notify;
pub mod register;
pub mod source;
pub mod tracker;

// Re-export key types at crate root for convenience
pub use allowlist::{AllowList, AllowListEntry, AllowListStore, StoreError};
pub use config::{Config, ConfigError};
pub use identity::DeviceIdentity;
pub use monitor::{EventLog, Monitor, MonitorOptions, PassSummary, UnauthorizedEvent};
pub use notify::{EmailConfig, EmailNotifier, Notifier, NotifyError};
pub use register::{RegisterError, RegisterOutcome};
pub use source::{DeviceSource, EnumerationError, PlatformSource, RawDeviceRecord};
pub use tracker::SightingTracker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
