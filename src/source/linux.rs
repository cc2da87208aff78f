//! Linux USB enumeration via `lsusb`.

use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::{DeviceSource, EnumerationError, RawDeviceRecord};

// Example line:
// Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub
static LSUSB_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ID ([0-9a-fA-F]{4}):([0-9a-fA-F]{4})\s*(.*)").expect("valid regex"));

static ISERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"iSerial\s+\d+\s+(\S+)").expect("valid regex"));

/// Enumerates devices by shelling out to `lsusb`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxSource {
    probe_serials: bool,
}

impl LinuxSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also issue a per-device `lsusb -v` query for serial numbers.
    ///
    /// One extra subprocess per device and often needs elevated privileges,
    /// so only the one-shot registration flow turns this on.
    pub fn with_serial_probe() -> Self {
        Self { probe_serials: true }
    }
}

impl DeviceSource for LinuxSource {
    fn enumerate(&self) -> Result<Vec<RawDeviceRecord>, EnumerationError> {
        let output = Command::new("lsusb")
            .output()
            .map_err(|e| EnumerationError::ToolUnavailable {
                tool: "lsusb",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EnumerationError::ToolFailed {
                tool: "lsusb",
                reason: format!("exit status {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut records = parse_lsusb(&stdout);

        if self.probe_serials {
            for record in &mut records {
                if let (Some(vid), Some(pid)) =
                    (record.vendor_id.as_deref(), record.product_id.as_deref())
                {
                    record.serial_number = probe_serial(vid, pid);
                }
            }
        }

        Ok(records)
    }
}

/// Parse `lsusb` summary output into raw records.
pub fn parse_lsusb(output: &str) -> Vec<RawDeviceRecord> {
    let mut records = Vec::new();

    for line in output.lines() {
        let Some(caps) = LSUSB_LINE.captures(line) else {
            continue;
        };

        let name = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
        let (manufacturer, product_name) = if name.is_empty() {
            (None, None)
        } else {
            match name.split_once(' ') {
                Some((vendor, product)) => {
                    (Some(vendor.to_string()), Some(product.to_string()))
                }
                // Single-word description: keep it as the product name too.
                None => (Some(name.to_string()), Some(name.to_string())),
            }
        };

        records.push(RawDeviceRecord {
            vendor_id: Some(caps[1].to_string()),
            product_id: Some(caps[2].to_string()),
            serial_number: None,
            manufacturer,
            product_name,
        });
    }

    records
}

/// Best-effort serial lookup via `lsusb -v -d vid:pid`.
fn probe_serial(vendor_id: &str, product_id: &str) -> Option<String> {
    let output = Command::new("lsusb")
        .args(["-v", "-d", &format!("{vendor_id}:{product_id}")])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    ISERIAL.captures(&stdout).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub
Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub
Bus 002 Device 003: ID 046D:C52B Logitech, Inc. Unifying Receiver
Bus 002 Device 004: ID 0781:5567
";

    #[test]
    fn test_parse_lsusb_extracts_ids_and_names() {
        let records = parse_lsusb(SAMPLE);
        assert_eq!(records.len(), 4);

        assert_eq!(records[0].vendor_id.as_deref(), Some("1d6b"));
        assert_eq!(records[0].product_id.as_deref(), Some("0002"));
        assert_eq!(records[0].manufacturer.as_deref(), Some("Linux"));
        assert_eq!(records[0].product_name.as_deref(), Some("Foundation 2.0 root hub"));

        // Uppercase ids pass through raw; the normalizer lowercases.
        assert_eq!(records[2].vendor_id.as_deref(), Some("046D"));
        assert_eq!(records[2].product_id.as_deref(), Some("C52B"));
    }

    #[test]
    fn test_parse_lsusb_tolerates_missing_description() {
        let records = parse_lsusb(SAMPLE);
        assert_eq!(records[3].vendor_id.as_deref(), Some("0781"));
        assert!(records[3].manufacturer.is_none());
        assert!(records[3].product_name.is_none());
    }

    #[test]
    fn test_parse_lsusb_skips_unrelated_lines() {
        let records = parse_lsusb("no devices here\n\n");
        assert!(records.is_empty());
    }

    #[test]
    fn test_iserial_regex() {
        let verbose = "  iSerial                 3 4C530001230423101234\n";
        let caps = ISERIAL.captures(verbose).unwrap();
        assert_eq!(&caps[1], "4C530001230423101234");
    }
}
