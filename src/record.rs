// 📇 Canonical Record - The ten-field inventory schema
// Every source shape is flattened into this before filtering and audit

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

// ============================================================================
// CANONICAL SCHEMA
// ============================================================================

/// Canonical column labels, in output order. The renderer and the CSV
/// export both consume this; it never changes per run.
pub const CANONICAL_COLUMNS: [&str; 10] = [
    "Serial Number",
    "Device Model",
    "P.O. Number",
    "Device Owner",
    "Computer Name",
    "Date of Latest Change",
    "Changed By",
    "Location",
    "Classification",
    "Comments",
];

/// One canonical inventory entry.
///
/// All fields are text, possibly empty. The fixed-arity struct is the
/// schema guarantee itself: a Record cannot be missing a column. Field
/// repair after construction is limited to the assembler's date
/// normalization and the auditor's location correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Record {
    #[serde(rename = "Serial Number")]
    pub serial_number: String,

    #[serde(rename = "Device Model")]
    pub device_model: String,

    #[serde(rename = "P.O. Number")]
    pub po_number: String,

    #[serde(rename = "Device Owner")]
    pub device_owner: String,

    #[serde(rename = "Computer Name")]
    pub computer_name: String,

    #[serde(rename = "Date of Latest Change")]
    pub date_of_latest_change: String,

    #[serde(rename = "Changed By")]
    pub changed_by: String,

    #[serde(rename = "Location")]
    pub location: String,

    #[serde(rename = "Classification")]
    pub classification: String,

    #[serde(rename = "Comments")]
    pub comments: String,
}

impl Record {
    /// Field values in canonical column order
    pub fn values(&self) -> [&str; 10] {
        [
            &self.serial_number,
            &self.device_model,
            &self.po_number,
            &self.device_owner,
            &self.computer_name,
            &self.date_of_latest_change,
            &self.changed_by,
            &self.location,
            &self.classification,
            &self.comments,
        ]
    }

    /// True when every field is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.values().iter().all(|v| v.trim().is_empty())
    }

    /// Structural fingerprint over all ten fields, used for exact
    /// whole-record deduplication. Fields are length-delimited so that
    /// adjacent values cannot collide across field boundaries.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for value in self.values() {
            hasher.update(value.len().to_le_bytes());
            hasher.update(value.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// ROW VALIDATOR
// ============================================================================

/// Decides whether a record's serial identifier is real data or junk.
///
/// Built once per run from config; consulted after attachment-row build,
/// after workflow build, and once more after final assembly.
#[derive(Debug, Clone)]
pub struct RowValidator {
    junk: HashSet<String>,
}

impl RowValidator {
    /// Build from the configured junk-value list. The empty string is
    /// always junk, whether or not the config lists it.
    pub fn new(junk_serials: &[String]) -> Self {
        let mut junk: HashSet<String> =
            junk_serials.iter().map(|s| s.trim().to_lowercase()).collect();
        junk.insert(String::new());
        RowValidator { junk }
    }

    /// True when the serial survives the junk check
    pub fn is_valid_serial(&self, serial: &str) -> bool {
        !self.junk.contains(&serial.trim().to_lowercase())
    }

    /// Keep only records with a valid serial, preserving order
    pub fn retain_valid(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|r| self.is_valid_serial(&r.serial_number))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn validator() -> RowValidator {
        RowValidator::new(&Config::default().junk_serials)
    }

    #[test]
    fn test_junk_serials_rejected_case_insensitively() {
        let v = validator();

        assert!(!v.is_valid_serial(""));
        assert!(!v.is_valid_serial("   "));
        assert!(!v.is_valid_serial("nan"));
        assert!(!v.is_valid_serial("NONE"));
        assert!(!v.is_valid_serial("N/A"));
        assert!(!v.is_valid_serial("Null"));
        assert!(!v.is_valid_serial("Serial Number"));
    }

    #[test]
    fn test_real_serials_accepted() {
        let v = validator();

        assert!(v.is_valid_serial("A1"));
        assert!(v.is_valid_serial("C02XL0GWJGH5"));
        assert!(v.is_valid_serial(" SN-42 "));
    }

    #[test]
    fn test_retain_valid_preserves_order() {
        let v = validator();
        let records = vec![
            Record {
                serial_number: "A1".to_string(),
                ..Record::default()
            },
            Record {
                serial_number: "nan".to_string(),
                ..Record::default()
            },
            Record {
                serial_number: "B2".to_string(),
                ..Record::default()
            },
        ];

        let kept = v.retain_valid(records);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].serial_number, "A1");
        assert_eq!(kept[1].serial_number, "B2");
    }

    #[test]
    fn test_fingerprint_differs_on_any_field() {
        let a = Record {
            serial_number: "A1".to_string(),
            ..Record::default()
        };
        let mut b = a.clone();

        assert_eq!(a.fingerprint(), b.fingerprint());

        b.comments = "x".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_respects_field_boundaries() {
        let a = Record {
            serial_number: "AB".to_string(),
            device_model: "C".to_string(),
            ..Record::default()
        };
        let b = Record {
            serial_number: "A".to_string(),
            device_model: "BC".to_string(),
            ..Record::default()
        };

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_blank_record_detection() {
        assert!(Record::default().is_blank());

        let r = Record {
            location: "BLDG1".to_string(),
            ..Record::default()
        };
        assert!(!r.is_blank());
    }
}
