//! macOS USB enumeration via `system_profiler SPUSBDataType`.

use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::{DeviceSource, EnumerationError, RawDeviceRecord};

static VENDOR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Vendor ID: 0x([0-9a-fA-F]{4})").expect("valid regex"));
static PRODUCT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Product ID: 0x([0-9a-fA-F]{4})").expect("valid regex"));
static MANUFACTURER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Manufacturer: (.+)").expect("valid regex"));
static PRODUCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"Product: (.+)").expect("valid regex"));
static SERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Serial Number: (.+)").expect("valid regex"));

/// Enumerates devices by parsing the system profiler's USB data type report.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacOsSource;

impl MacOsSource {
    pub fn new() -> Self {
        Self
    }

    /// The profiler report already includes serial numbers where the device
    /// exposes one. Exists to mirror the other backends.
    pub fn with_serial_probe() -> Self {
        Self
    }
}

impl DeviceSource for MacOsSource {
    fn enumerate(&self) -> Result<Vec<RawDeviceRecord>, EnumerationError> {
        let output = Command::new("system_profiler")
            .arg("SPUSBDataType")
            .output()
            .map_err(|e| EnumerationError::ToolUnavailable {
                tool: "system_profiler",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EnumerationError::ToolFailed {
                tool: "system_profiler",
                reason: format!("exit status {}", output.status),
            });
        }

        Ok(parse_system_profiler(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse the profiler report, one device per blank-line-separated section.
pub fn parse_system_profiler(output: &str) -> Vec<RawDeviceRecord> {
    let mut records = Vec::new();

    for section in output.split("\n\n") {
        if !section.contains("Vendor ID:") {
            continue;
        }

        let capture = |re: &Regex| {
            re.captures(section)
                .map(|caps| caps[1].trim().to_string())
        };

        records.push(RawDeviceRecord {
            vendor_id: capture(&VENDOR_ID),
            product_id: capture(&PRODUCT_ID),
            serial_number: capture(&SERIAL),
            manufacturer: capture(&MANUFACTURER),
            product_name: capture(&PRODUCT),
        });
    }

    records
}
