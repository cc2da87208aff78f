//! Interactive registration of a connected device into the allow-list.
//!
//! One-shot flow: enumerate once, present an indexed listing, and append the
//! operator's selection to the store after an explicit confirmation. Any
//! malformed input produces a clear error and no mutation.

use std::io::{self, BufRead, Write};

use crate::allowlist::{AllowListEntry, AllowListStore, StoreError};
use crate::identity::DeviceIdentity;
use crate::source::{DeviceSource, EnumerationError};

/// Errors from the registration flow.
#[derive(Debug)]
pub enum RegisterError {
    Enumeration(EnumerationError),
    /// Nothing usable is connected; there is nothing to register.
    NoDevices,
    /// Invalid selection or non-numeric input.
    Input(String),
    Store(StoreError),
    Io(String),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::Enumeration(e) => write!(f, "device enumeration failed: {e}"),
            RegisterError::NoDevices => {
                write!(f, "no USB devices detected; check that devices are connected")
            }
            RegisterError::Input(e) => write!(f, "{e}"),
            RegisterError::Store(e) => write!(f, "{e}"),
            RegisterError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for RegisterError {}

impl From<io::Error> for RegisterError {
    fn from(e: io::Error) -> Self {
        RegisterError::Io(e.to_string())
    }
}

/// What the operator chose from the device listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// `0`: leave without changes.
    Abort,
    /// Zero-based index into the listing.
    Device(usize),
}

/// Parse a 1-based device selection, where `0` aborts.
pub fn parse_selection(input: &str, device_count: usize) -> Result<Selection, RegisterError> {
    let trimmed = input.trim();
    let choice: usize = trimmed.parse().map_err(|_| {
        RegisterError::Input(format!("invalid input '{trimmed}': enter a number"))
    })?;

    if choice == 0 {
        Ok(Selection::Abort)
    } else if choice > device_count {
        Err(RegisterError::Input(format!(
            "selection {choice} is out of range (1-{device_count})"
        )))
    } else {
        Ok(Selection::Device(choice - 1))
    }
}

/// How a registration run ended. Every variant except `Registered` leaves
/// the store untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(AllowListEntry),
    /// The operator selected `0`.
    Aborted,
    /// The operator declined at the confirmation prompt.
    Declined,
}

/// Run the one-shot registration flow against the given store.
///
/// Input and output are injected so the flow is scriptable and testable;
/// `main` wires them to stdin/stdout.
pub fn run<S, R, W>(
    source: &S,
    store: &AllowListStore,
    added_by: &str,
    input: &mut R,
    out: &mut W,
) -> Result<RegisterOutcome, RegisterError>
where
    S: DeviceSource,
    R: BufRead,
    W: Write,
{
    writeln!(out, "Detecting connected USB devices...")?;
    let records = source.enumerate().map_err(RegisterError::Enumeration)?;
    let devices: Vec<DeviceIdentity> =
        records.iter().filter_map(DeviceIdentity::from_raw).collect();

    if devices.is_empty() {
        return Err(RegisterError::NoDevices);
    }

    writeln!(out, "Found {} USB device(s):", devices.len())?;
    for (i, device) in devices.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "{}. {}", i + 1, device.display_name())?;
        writeln!(out, "   VID: {} | PID: {}", device.vendor_id, device.product_id)?;
        writeln!(out, "   S/N: {}", device.serial_number)?;
    }
    writeln!(out)?;

    let answer = prompt(input, out, "Enter the number of the device to authorize (0 to exit): ")?;
    let selected = match parse_selection(&answer, devices.len())? {
        Selection::Abort => {
            writeln!(out, "Exiting without changes.")?;
            return Ok(RegisterOutcome::Aborted);
        }
        Selection::Device(index) => devices[index].clone(),
    };

    let department = prompt(input, out, "Enter department for this device: ")?;

    writeln!(out)?;
    writeln!(out, "About to authorize the following device:")?;
    writeln!(out, "  Device:     {}", selected.display_name())?;
    writeln!(out, "  VID: {} | PID: {}", selected.vendor_id, selected.product_id)?;
    writeln!(out, "  S/N:        {}", selected.serial_number)?;
    writeln!(out, "  Department: {department}")?;

    let confirmation = prompt(input, out, "Add this device to the authorized list? (y/n): ")?;
    if !confirmation.eq_ignore_ascii_case("y") {
        writeln!(out, "Operation cancelled. No changes made.")?;
        return Ok(RegisterOutcome::Declined);
    }

    let entry = AllowListEntry::new(selected, added_by, &department);
    store.append(&entry).map_err(RegisterError::Store)?;
    writeln!(out, "Device added to the authorized list.")?;

    Ok(RegisterOutcome::Registered(entry))
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    text: &str,
) -> Result<String, RegisterError> {
    write!(out, "{text}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(RegisterError::Input("unexpected end of input".to_string()));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawDeviceRecord;
    use std::io::Cursor;
    use tempfile::tempdir;

    struct FakeSource {
        records: Vec<RawDeviceRecord>,
    }

    impl DeviceSource for FakeSource {
        fn enumerate(&self) -> Result<Vec<RawDeviceRecord>, EnumerationError> {
            Ok(self.records.clone())
        }
    }

    fn source() -> FakeSource {
        FakeSource {
            records: vec![
                RawDeviceRecord {
                    vendor_id: Some("046d".to_string()),
                    product_id: Some("c52b".to_string()),
                    serial_number: Some("SN-1".to_string()),
                    manufacturer: Some("Logitech".to_string()),
                    product_name: Some("Unifying Receiver".to_string()),
                },
                RawDeviceRecord {
                    vendor_id: Some("0781".to_string()),
                    product_id: Some("5567".to_string()),
                    ..RawDeviceRecord::default()
                },
            ],
        }
    }

    fn run_flow(store: &AllowListStore, input: &str) -> Result<RegisterOutcome, RegisterError> {
        let mut output = Vec::new();
        run(
            &source(),
            store,
            "admin",
            &mut Cursor::new(input.as_bytes()),
            &mut output,
        )
    }

    #[test]
    fn test_parse_selection_bounds() {
        assert_eq!(parse_selection("0", 3).unwrap(), Selection::Abort);
        assert_eq!(parse_selection("1", 3).unwrap(), Selection::Device(0));
        assert_eq!(parse_selection(" 3 ", 3).unwrap(), Selection::Device(2));
        assert!(matches!(parse_selection("4", 3), Err(RegisterError::Input(_))));
        assert!(matches!(parse_selection("abc", 3), Err(RegisterError::Input(_))));
        assert!(matches!(parse_selection("-1", 3), Err(RegisterError::Input(_))));
    }

    #[test]
    fn test_abort_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.csv");
        let store = AllowListStore::new(&path);

        let outcome = run_flow(&store, "0\n").unwrap();
        assert_eq!(outcome, RegisterOutcome::Aborted);
        assert!(!path.exists());
    }

    #[test]
    fn test_decline_at_confirmation_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.csv");
        let store = AllowListStore::new(&path);

        let outcome = run_flow(&store, "1\nIT\nn\n").unwrap();
        assert_eq!(outcome, RegisterOutcome::Declined);
        assert!(!path.exists());
    }

    #[test]
    fn test_confirmed_registration_appends_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.csv");
        let store = AllowListStore::new(&path);

        let outcome = run_flow(&store, "1\nEngineering\ny\n").unwrap();
        let RegisterOutcome::Registered(entry) = outcome else {
            panic!("expected a registration");
        };
        assert_eq!(entry.identity.vendor_id, "046d");
        assert_eq!(entry.department, "Engineering");
        assert_eq!(entry.added_by, "admin");

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].identity, entry.identity);
    }

    #[test]
    fn test_out_of_range_selection_is_an_input_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authorized.csv");
        let store = AllowListStore::new(&path);

        assert!(matches!(
            run_flow(&store, "9\n"),
            Err(RegisterError::Input(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_no_devices_is_reported() {
        let dir = tempdir().unwrap();
        let store = AllowListStore::new(dir.path().join("authorized.csv"));
        let empty = FakeSource { records: Vec::new() };
        let mut output = Vec::new();

        let result = run(
            &empty,
            &store,
            "admin",
            &mut Cursor::new(b"" as &[u8]),
            &mut output,
        );
        assert!(matches!(result, Err(RegisterError::NoDevices)));
    }

    #[test]
    fn test_listing_shows_every_device() {
        let dir = tempdir().unwrap();
        let store = AllowListStore::new(dir.path().join("authorized.csv"));
        let mut output = Vec::new();

        run(
            &source(),
            &store,
            "admin",
            &mut Cursor::new(b"0\n" as &[u8]),
            &mut output,
        )
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1. Logitech Unifying Receiver"));
        assert!(text.contains("2. Unknown Device"));
        assert!(text.contains("VID: 0781 | PID: 5567"));
    }
}
