//! Raw device records as reported by the platform enumeration tools.

/// An unnormalized device descriptor.
///
/// Carries whatever fields the platform could supply; absent and empty
/// fields are tolerated here and resolved to defaults (or the whole record
/// dropped) by the identity normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDeviceRecord {
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
}
