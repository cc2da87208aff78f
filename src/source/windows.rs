//! Windows USB enumeration via PowerShell `Get-PnpDevice`.

use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::{DeviceSource, EnumerationError, RawDeviceRecord};

const PNP_QUERY: &str = "Get-PnpDevice -PresentOnly | Where-Object { $_.InstanceId -match '^USB' } | Select-Object -Property FriendlyName, InstanceId, DeviceID | ConvertTo-Json";

static VID: Lazy<Regex> = Lazy::new(|| Regex::new(r"VID_([0-9A-Fa-f]{4})").expect("valid regex"));
static PID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PID_([0-9A-Fa-f]{4})").expect("valid regex"));

/// Enumerates devices through a PowerShell PnP query.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsSource;

impl WindowsSource {
    pub fn new() -> Self {
        Self
    }

    /// Serial numbers already ride in the PnP instance id, so the probing
    /// variant is the same source. Exists to mirror the other backends.
    pub fn with_serial_probe() -> Self {
        Self
    }
}

impl DeviceSource for WindowsSource {
    fn enumerate(&self) -> Result<Vec<RawDeviceRecord>, EnumerationError> {
        let output = Command::new("powershell")
            .args(["-Command", PNP_QUERY])
            .output()
            .map_err(|e| EnumerationError::ToolUnavailable {
                tool: "powershell",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EnumerationError::ToolFailed {
                tool: "powershell",
                reason: format!("exit status {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        parse_pnp_json(&stdout).map_err(|e| EnumerationError::ToolFailed {
            tool: "powershell",
            reason: format!("unparseable output: {e}"),
        })
    }
}

/// Parse the `ConvertTo-Json` output of the PnP query.
///
/// PowerShell serializes a single device as a bare object and several
/// devices as an array; both shapes are accepted.
pub fn parse_pnp_json(json: &str) -> Result<Vec<RawDeviceRecord>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let devices = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut records = Vec::new();
    for device in &devices {
        let device_id = device.get("DeviceID").and_then(|v| v.as_str()).unwrap_or("");
        let instance_id = device.get("InstanceId").and_then(|v| v.as_str()).unwrap_or("");
        let friendly = device
            .get("FriendlyName")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();

        records.push(RawDeviceRecord {
            vendor_id: VID.captures(device_id).map(|caps| caps[1].to_string()),
            product_id: PID.captures(device_id).map(|caps| caps[1].to_string()),
            serial_number: serial_from_instance_id(instance_id),
            // A one-word friendly name is a product, not a vendor prefix;
            // leave the manufacturer for the normalizer to default.
            manufacturer: friendly
                .split_once(char::is_whitespace)
                .map(|(vendor, _)| vendor.to_string()),
            product_name: (!friendly.is_empty()).then(|| friendly.to_string()),
        });
    }

    Ok(records)
}

/// The serial (or a bus-assigned identifier) is the segment after the last
/// backslash of the instance id.
fn serial_from_instance_id(instance_id: &str) -> Option<String> {
    let (_, tail) = instance_id.rsplit_once('\\')?;
    (!tail.is_empty()).then(|| tail.to_string())
}
