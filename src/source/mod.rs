//! Device enumeration for USB Sentry.
//!
//! Each supported platform exposes attached USB devices through a different
//! host tool; every backend here shells out to that tool, parses its output
//! into [`RawDeviceRecord`]s, and leaves normalization to the identity layer.

pub mod linux;
pub mod macos;
pub mod types;
pub mod windows;

pub use linux::LinuxSource;
pub use macos::MacOsSource;
pub use types::RawDeviceRecord;
pub use windows::WindowsSource;

/// A source of raw device records for the current instant.
///
/// Zero attached devices is an empty list, never an error; an error means
/// enumeration was structurally impossible (platform tool missing or
/// failing), which the monitor treats as "zero devices this pass".
pub trait DeviceSource {
    fn enumerate(&self) -> Result<Vec<RawDeviceRecord>, EnumerationError>;
}

/// The platform device could not be queried at all.
#[derive(Debug)]
pub enum EnumerationError {
    /// The enumeration tool could not be started.
    ToolUnavailable { tool: &'static str, reason: String },
    /// The tool ran but reported failure or produced unusable output.
    ToolFailed { tool: &'static str, reason: String },
}

impl std::fmt::Display for EnumerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnumerationError::ToolUnavailable { tool, reason } => {
                write!(f, "could not run {tool}: {reason}")
            }
            EnumerationError::ToolFailed { tool, reason } => {
                write!(f, "{tool} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for EnumerationError {}

/// Platform-appropriate source for the current build target.
#[cfg(target_os = "windows")]
pub type PlatformSource = WindowsSource;

/// Platform-appropriate source for the current build target.
#[cfg(target_os = "macos")]
pub type PlatformSource = MacOsSource;

/// Platform-appropriate source for the current build target.
///
/// Non-Apple unixes get the `lsusb` backend.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub type PlatformSource = LinuxSource;
