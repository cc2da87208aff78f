//! Canonical USB device identity.
//!
//! Raw platform records are normalized here exactly once, at ingestion.
//! Everything downstream (matching, sighting dedup, persistence) compares
//! plain lowercase strings and never needs to re-check case or absence.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::source::RawDeviceRecord;

/// Sentinel recorded when a source cannot supply a serial number.
pub const UNKNOWN_SERIAL: &str = "unknown";
/// Default manufacturer when the source leaves it blank.
pub const UNKNOWN_MANUFACTURER: &str = "Unknown";
/// Default product name when the source leaves it blank.
pub const UNKNOWN_PRODUCT: &str = "Unknown Device";

static HEX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{4}$").expect("valid regex"));

/// A normalized USB device identity.
///
/// `vendor_id` and `product_id` are always four lowercase hex digits.
/// The remaining fields are captured for audit and display; the matching
/// key is the `(vendor_id, product_id)` pair only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: String,
    pub product_id: String,
    pub serial_number: String,
    pub manufacturer: String,
    pub product_name: String,
}

impl DeviceIdentity {
    /// Normalize a raw platform record into a canonical identity.
    ///
    /// Returns `None` when the record lacks a usable vendor/product id pair;
    /// such a record cannot be matched or reported meaningfully, so it is
    /// dropped before it reaches the rest of the pipeline. Every other
    /// missing field becomes a defined default, never an absent value.
    pub fn from_raw(raw: &RawDeviceRecord) -> Option<Self> {
        let vendor_id = normalize_id(raw.vendor_id.as_deref()?)?;
        let product_id = normalize_id(raw.product_id.as_deref()?)?;

        Some(Self {
            vendor_id,
            product_id,
            serial_number: field_or(raw.serial_number.as_deref(), UNKNOWN_SERIAL),
            manufacturer: field_or(raw.manufacturer.as_deref(), UNKNOWN_MANUFACTURER),
            product_name: field_or(raw.product_name.as_deref(), UNKNOWN_PRODUCT),
        })
    }

    /// Composite key used for allow-list matching and sighting dedup.
    pub fn key(&self) -> String {
        format!("{}:{}", self.vendor_id, self.product_id)
    }

    /// Human-readable name for alerts and listings.
    pub fn display_name(&self) -> String {
        if self.manufacturer == UNKNOWN_MANUFACTURER {
            self.product_name.clone()
        } else {
            format!("{} {}", self.manufacturer, self.product_name)
        }
    }
}

/// Lowercase an identifier and require exactly four hex digits.
fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    HEX_ID.is_match(&id).then_some(id)
}

fn field_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(vendor: Option<&str>, product: Option<&str>) -> RawDeviceRecord {
        RawDeviceRecord {
            vendor_id: vendor.map(str::to_string),
            product_id: product.map(str::to_string),
            ..RawDeviceRecord::default()
        }
    }

    #[test]
    fn test_normalizes_uppercase_ids() {
        let identity = DeviceIdentity::from_raw(&raw(Some("1A2B"), Some("C52B"))).unwrap();
        assert_eq!(identity.vendor_id, "1a2b");
        assert_eq!(identity.product_id, "c52b");
    }

    #[test]
    fn test_drops_record_without_vendor_id() {
        assert!(DeviceIdentity::from_raw(&raw(None, Some("c52b"))).is_none());
        assert!(DeviceIdentity::from_raw(&raw(Some("046d"), None)).is_none());
    }

    #[test]
    fn test_drops_record_with_malformed_id() {
        assert!(DeviceIdentity::from_raw(&raw(Some("46d"), Some("c52b"))).is_none());
        assert!(DeviceIdentity::from_raw(&raw(Some("046dx"), Some("c52b"))).is_none());
        assert!(DeviceIdentity::from_raw(&raw(Some(""), Some("c52b"))).is_none());
    }

    #[test]
    fn test_missing_fields_become_defaults() {
        let identity = DeviceIdentity::from_raw(&raw(Some("046d"), Some("c52b"))).unwrap();
        assert_eq!(identity.serial_number, UNKNOWN_SERIAL);
        assert_eq!(identity.manufacturer, UNKNOWN_MANUFACTURER);
        assert_eq!(identity.product_name, UNKNOWN_PRODUCT);
    }

    #[test]
    fn test_blank_fields_become_defaults() {
        let mut record = raw(Some("046d"), Some("c52b"));
        record.serial_number = Some("  ".to_string());
        record.manufacturer = Some(String::new());
        let identity = DeviceIdentity::from_raw(&record).unwrap();
        assert_eq!(identity.serial_number, UNKNOWN_SERIAL);
        assert_eq!(identity.manufacturer, UNKNOWN_MANUFACTURER);
    }

    #[test]
    fn test_key_format() {
        let identity = DeviceIdentity::from_raw(&raw(Some("046D"), Some("C52B"))).unwrap();
        assert_eq!(identity.key(), "046d:c52b");
    }

    #[test]
    fn test_display_name_skips_unknown_manufacturer() {
        let mut record = raw(Some("046d"), Some("c52b"));
        record.product_name = Some("USB Receiver".to_string());
        let identity = DeviceIdentity::from_raw(&record).unwrap();
        assert_eq!(identity.display_name(), "USB Receiver");

        record.manufacturer = Some("Logitech".to_string());
        let identity = DeviceIdentity::from_raw(&record).unwrap();
        assert_eq!(identity.display_name(), "Logitech USB Receiver");
    }
}
