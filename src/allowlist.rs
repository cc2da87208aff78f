//! Allow-list storage and matching.
//!
//! The allow-list is a flat CSV file of previously authorized devices.
//! It is loaded once per session into an [`AllowList`], which precomputes
//! the key set so authorization checks are O(1).

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::warn;

use crate::csvio;
use crate::identity::DeviceIdentity;
use crate::source::RawDeviceRecord;

/// Column order of the allow-list CSV.
pub const ALLOW_LIST_COLUMNS: [&str; 8] = [
    "vendor_id",
    "product_id",
    "serial_number",
    "manufacturer",
    "product_name",
    "date_added",
    "added_by",
    "department",
];

/// One authorized device plus its registration metadata.
///
/// Entries are append-only: created through the registration flow, never
/// edited or deleted here (revocation is out of scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    pub identity: DeviceIdentity,
    pub date_added: String,
    pub added_by: String,
    pub department: String,
}

impl AllowListEntry {
    /// Build an entry for a device authorized today.
    pub fn new(identity: DeviceIdentity, added_by: &str, department: &str) -> Self {
        Self {
            identity,
            date_added: Local::now().format("%Y-%m-%d").to_string(),
            added_by: added_by.to_string(),
            department: department.to_string(),
        }
    }
}

/// Errors from the allow-list store.
#[derive(Debug)]
pub enum StoreError {
    Load { path: PathBuf, reason: String },
    Append { path: PathBuf, reason: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Load { path, reason } => {
                write!(f, "could not load allow-list {}: {reason}", path.display())
            }
            StoreError::Append { path, reason } => {
                write!(f, "could not append to allow-list {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// CSV-backed persistence for authorized devices.
#[derive(Debug, Clone)]
pub struct AllowListStore {
    path: PathBuf,
}

impl AllowListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries.
    ///
    /// A missing or empty file yields an empty list. A file that cannot be
    /// read, or whose header lacks the vendor/product id columns, fails the
    /// whole load. Individual records without a valid vendor/product id pair
    /// are skipped with a warning rather than aborting.
    pub fn load(&self) -> Result<Vec<AllowListEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let load_err = |reason: String| StoreError::Load {
            path: self.path.clone(),
            reason,
        };

        let file = File::open(&self.path).map_err(|e| load_err(e.to_string()))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            None => return Ok(Vec::new()),
            Some(line) => line.map_err(|e| load_err(e.to_string()))?,
        };
        let index = HeaderIndex::parse(&header).map_err(load_err)?;

        let mut entries = Vec::new();
        for (offset, line) in lines.enumerate() {
            let line = line.map_err(|e| load_err(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = csvio::split_record(&line);
            match index.entry(&fields) {
                Some(entry) => entries.push(entry),
                None => warn!(
                    "skipping allow-list record on line {} of {}: missing or invalid vendor/product id",
                    offset + 2,
                    self.path.display()
                ),
            }
        }

        Ok(entries)
    }

    /// Append one entry, creating the file and its header on first use.
    ///
    /// The header and record go out in a single write so a failed append
    /// leaves no partial record behind. No dedup is performed: registering
    /// the same device twice produces two entries, and the matcher only
    /// checks existence.
    pub fn append(&self, entry: &AllowListEntry) -> Result<(), StoreError> {
        let append_err = |reason: String| StoreError::Append {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| append_err(e.to_string()))?;
            }
        }

        let is_new = !self.path.exists();
        let mut payload = String::new();
        if is_new {
            payload.push_str(&csvio::format_record(&ALLOW_LIST_COLUMNS));
            payload.push('\n');
        }
        payload.push_str(&csvio::format_record(&[
            &entry.identity.vendor_id,
            &entry.identity.product_id,
            &entry.identity.serial_number,
            &entry.identity.manufacturer,
            &entry.identity.product_name,
            &entry.date_added,
            &entry.added_by,
            &entry.department,
        ]));
        payload.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| append_err(e.to_string()))?;
        file.write_all(payload.as_bytes())
            .map_err(|e| append_err(e.to_string()))?;
        file.flush().map_err(|e| append_err(e.to_string()))?;

        Ok(())
    }
}

/// Column positions resolved from the header row, so column order in an
/// existing file does not matter.
struct HeaderIndex {
    vendor_id: usize,
    product_id: usize,
    serial_number: Option<usize>,
    manufacturer: Option<usize>,
    product_name: Option<usize>,
    date_added: Option<usize>,
    added_by: Option<usize>,
    department: Option<usize>,
}

impl HeaderIndex {
    fn parse(header: &str) -> Result<Self, String> {
        let columns = csvio::split_record(header);
        let find = |name: &str| columns.iter().position(|c| c.trim() == name);

        let vendor_id = find("vendor_id")
            .ok_or_else(|| "header is missing the vendor_id column".to_string())?;
        let product_id = find("product_id")
            .ok_or_else(|| "header is missing the product_id column".to_string())?;

        Ok(Self {
            vendor_id,
            product_id,
            serial_number: find("serial_number"),
            manufacturer: find("manufacturer"),
            product_name: find("product_name"),
            date_added: find("date_added"),
            added_by: find("added_by"),
            department: find("department"),
        })
    }

    /// Build an entry from one record, running the stored identifiers
    /// through the same normalizer used for live devices.
    fn entry(&self, fields: &[String]) -> Option<AllowListEntry> {
        let get = |index: Option<usize>| index.and_then(|i| fields.get(i).cloned());

        let raw = RawDeviceRecord {
            vendor_id: fields.get(self.vendor_id).cloned(),
            product_id: fields.get(self.product_id).cloned(),
            serial_number: get(self.serial_number),
            manufacturer: get(self.manufacturer),
            product_name: get(self.product_name),
        };
        let identity = DeviceIdentity::from_raw(&raw)?;

        Some(AllowListEntry {
            identity,
            date_added: get(self.date_added).unwrap_or_default(),
            added_by: get(self.added_by).unwrap_or_default(),
            department: get(self.department).unwrap_or_default(),
        })
    }
}

/// A loaded allow-list with a precomputed key set.
#[derive(Debug, Default)]
pub struct AllowList {
    entries: Vec<AllowListEntry>,
    keys: HashSet<String>,
}

impl AllowList {
    pub fn new(entries: Vec<AllowListEntry>) -> Self {
        let keys = entries.iter().map(|e| e.identity.key()).collect();
        Self { entries, keys }
    }

    /// A device is authorized iff some entry shares its vendor/product pair.
    /// Serial numbers are not consulted: any unit of an approved pair passes.
    pub fn is_authorized(&self, identity: &DeviceIdentity) -> bool {
        self.keys.contains(&identity.key())
    }

    pub fn entries(&self) -> &[AllowListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
