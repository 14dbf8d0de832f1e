// 🚨 Anomaly Auditor - Post-assembly validation pass
// Location correction, date-outlier consensus, master-list cross-reference

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::Config;
use crate::extract::parse_date;
use crate::record::Record;

// ============================================================================
// PER-ROW FLAGS
// ============================================================================

/// Review flags for one row. Sub-passes are independent, so any
/// combination can be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub missing_location: bool,
    pub date_outlier: bool,
    pub unknown_serial: bool,
}

impl FlagSet {
    pub fn is_flagged(&self) -> bool {
        self.missing_location || self.date_outlier || self.unknown_serial
    }

    /// Human-readable flag labels for the report
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.missing_location {
            labels.push("missing location");
        }
        if self.date_outlier {
            labels.push("date outlier");
        }
        if self.unknown_serial {
            labels.push("unknown serial");
        }
        labels
    }
}

// ============================================================================
// AUDIT OUTCOME
// ============================================================================

/// Everything the audit pass found, flags parallel to the record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    /// One entry per record, same order as the audited slice
    pub flags: Vec<FlagSet>,

    pub corrections_applied: usize,
    pub missing_locations: usize,
    pub date_outliers: usize,
    pub unknown_serials: usize,

    /// The modal (year, month) the outlier pass compared against, absent
    /// when no date in the batch parsed
    pub consensus_period: Option<(i32, u32)>,

    /// Distinguishes "zero mismatches found" from "check never ran"
    pub serial_check_performed: bool,
}

// ============================================================================
// ANOMALY AUDITOR
// ============================================================================

pub struct AnomalyAuditor<'a> {
    config: &'a Config,
    skip_locations: HashSet<String>,
}

impl<'a> AnomalyAuditor<'a> {
    pub fn new(config: &'a Config) -> Self {
        AnomalyAuditor {
            skip_locations: config.skip_locations(),
            config,
        }
    }

    /// Run all three sub-passes over the assembled, ordered record set.
    ///
    /// Location corrections are written back into the records; the other
    /// passes only flag. `master` being None skips the cross-reference
    /// entirely, which the outcome records as not-performed.
    pub fn audit(
        &self,
        records: &mut [Record],
        master: Option<&HashSet<String>>,
    ) -> AuditOutcome {
        let mut outcome = AuditOutcome {
            flags: vec![FlagSet::default(); records.len()],
            corrections_applied: 0,
            missing_locations: 0,
            date_outliers: 0,
            unknown_serials: 0,
            consensus_period: None,
            serial_check_performed: false,
        };

        self.audit_locations(records, &mut outcome);
        self.audit_dates(records, &mut outcome);
        if let Some(master) = master {
            self.audit_serials(records, master, &mut outcome);
        }

        outcome
    }

    // ------------------------------------------------------------------------
    // Sub-pass 1: location normalization/correction
    // ------------------------------------------------------------------------

    fn audit_locations(&self, records: &mut [Record], outcome: &mut AuditOutcome) {
        for (i, record) in records.iter_mut().enumerate() {
            let upper = record.location.trim().to_uppercase();

            if self.skip_locations.contains(&upper) {
                outcome.flags[i].missing_location = true;
                outcome.missing_locations += 1;
                continue;
            }

            // space-stripped prefix match against the correction table,
            // in table order, first match wins
            let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
            for (bad, good) in &self.config.corrections {
                if compact.starts_with(bad.as_str()) {
                    record.location = format!("{}{}", good, &compact[bad.len()..]);
                    outcome.corrections_applied += 1;
                    break;
                }
            }
            // no match leaves the original value untouched
        }
    }

    // ------------------------------------------------------------------------
    // Sub-pass 2: date-outlier detection by (year, month) consensus
    // ------------------------------------------------------------------------

    fn audit_dates(&self, records: &[Record], outcome: &mut AuditOutcome) {
        use chrono::Datelike;

        // unparsable dates are invisible here: not counted, not flagged
        let periods: Vec<(i32, u32)> = records
            .iter()
            .filter_map(|r| parse_date(&r.date_of_latest_change))
            .map(|d| (d.year(), d.month()))
            .collect();

        let Some(consensus) = modal_period(&periods) else {
            return;
        };
        outcome.consensus_period = Some(consensus);

        for (i, record) in records.iter().enumerate() {
            if let Some(d) = parse_date(&record.date_of_latest_change) {
                if (d.year(), d.month()) != consensus {
                    outcome.flags[i].date_outlier = true;
                    outcome.date_outliers += 1;
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Sub-pass 3: master-list cross-reference
    // ------------------------------------------------------------------------

    fn audit_serials(
        &self,
        records: &[Record],
        master: &HashSet<String>,
        outcome: &mut AuditOutcome,
    ) {
        outcome.serial_check_performed = true;

        for (i, record) in records.iter().enumerate() {
            let serial = record.serial_number.trim();
            if !serial.is_empty() && !master.contains(serial) {
                outcome.flags[i].unknown_serial = true;
                outcome.unknown_serials += 1;
            }
        }
    }
}

/// Most frequent (year, month) pair; ties go to the pair seen first
fn modal_period(periods: &[(i32, u32)]) -> Option<(i32, u32)> {
    let mut counts: HashMap<(i32, u32), (usize, usize)> = HashMap::new();
    for (seen_at, &period) in periods.iter().enumerate() {
        let entry = counts.entry(period).or_insert((0, seen_at));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| {
            // higher count wins; on a tie the earlier first-seen wins
            a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1))
        })
        .map(|(period, _)| period)
}

// ============================================================================
// MASTER LIST LOADER
// ============================================================================

/// Read the reference identifier set from a one-column CSV file.
///
/// Only the first column is consulted; the header row is skipped. A read
/// failure here is non-fatal to the batch - the caller logs it and runs
/// the audit without the cross-reference.
pub fn load_master_list<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())
        .with_context(|| format!("Failed to open master list: {:?}", path.as_ref()))?;

    let mut set = HashSet::new();
    for row in reader.records() {
        let row = row.context("Failed to read master list row")?;
        if let Some(first) = row.get(0) {
            let first = first.trim();
            if !first.is_empty() {
                set.insert(first.to_string());
            }
        }
    }
    Ok(set)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(serial: &str, date: &str, location: &str) -> Record {
        Record {
            serial_number: serial.to_string(),
            date_of_latest_change: date.to_string(),
            location: location.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn test_location_prefix_correction() {
        let config = Config {
            corrections: vec![("BLD1".to_string(), "BLDG1".to_string())],
            ..Config::default()
        };
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![record("A1", "", "bld 1 203")];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(records[0].location, "BLDG1203");
        assert_eq!(outcome.corrections_applied, 1);
        assert!(!outcome.flags[0].missing_location);
    }

    #[test]
    fn test_correction_table_order_first_match_wins() {
        let config = Config {
            corrections: vec![
                ("BLD".to_string(), "BUILDING".to_string()),
                ("BLD1".to_string(), "NEVER".to_string()),
            ],
            ..Config::default()
        };
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![record("A1", "", "BLD1 203")];
        auditor.audit(&mut records, None);

        assert_eq!(records[0].location, "BUILDING1203");
    }

    #[test]
    fn test_unmatched_location_left_as_is() {
        let config = Config {
            corrections: vec![("BLD1".to_string(), "BLDG1".to_string())],
            ..Config::default()
        };
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![record("A1", "", "Annex B 14")];
        let outcome = auditor.audit(&mut records, None);

        // no correction means no rewrite, not even case folding
        assert_eq!(records[0].location, "Annex B 14");
        assert_eq!(outcome.corrections_applied, 0);
    }

    #[test]
    fn test_missing_location_flagged_and_skipped() {
        let config = Config {
            corrections: vec![("NA".to_string(), "BOOM".to_string())],
            ..Config::default()
        };
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![
            record("A1", "", ""),
            record("B2", "", "n/a"),
            record("C3", "", "N/A, Workflow"),
        ];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(outcome.missing_locations, 3);
        assert!(outcome.flags.iter().all(|f| f.missing_location));
        // skip-set rows never reach the correction table
        assert_eq!(records[1].location, "n/a");
        assert_eq!(outcome.corrections_applied, 0);
    }

    #[test]
    fn test_date_outlier_consensus() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![
            record("1", "01/05/2024", "X"),
            record("2", "01/12/2024", "X"),
            record("3", "01/19/2024", "X"),
            record("4", "01/26/2024", "X"),
            record("5", "01/31/2024", "X"),
            record("6", "02/02/2024", "X"),
        ];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(outcome.consensus_period, Some((2024, 1)));
        assert_eq!(outcome.date_outliers, 1);
        assert!(outcome.flags[5].date_outlier);
        assert!(!outcome.flags[0].date_outlier);
    }

    #[test]
    fn test_no_outliers_when_all_dates_agree() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![
            record("1", "01/05/2024", "X"),
            record("2", "01/30/2024", "X"),
        ];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(outcome.date_outliers, 0);
    }

    #[test]
    fn test_unparsable_dates_excluded_from_consensus_and_flags() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![
            record("1", "01/05/2024", "X"),
            record("2", "N/A, Workflow", "X"),
        ];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(outcome.consensus_period, Some((2024, 1)));
        assert!(!outcome.flags[1].date_outlier);
        assert_eq!(outcome.date_outliers, 0);
    }

    #[test]
    fn test_zero_parseable_dates_skips_the_pass() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![record("1", "whenever", "X"), record("2", "", "X")];
        let outcome = auditor.audit(&mut records, None);

        assert_eq!(outcome.consensus_period, None);
        assert_eq!(outcome.date_outliers, 0);
    }

    #[test]
    fn test_consensus_tie_goes_to_first_encountered() {
        assert_eq!(
            modal_period(&[(2024, 2), (2024, 1), (2024, 1), (2024, 2)]),
            Some((2024, 2))
        );
        assert_eq!(modal_period(&[]), None);
    }

    #[test]
    fn test_master_list_cross_reference() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let master: HashSet<String> = ["SN001", "SN002"].iter().map(|s| s.to_string()).collect();
        let mut records = vec![record("SN001", "", "X"), record("SN003", "", "X")];

        let outcome = auditor.audit(&mut records, Some(&master));

        assert!(outcome.serial_check_performed);
        assert_eq!(outcome.unknown_serials, 1);
        assert!(!outcome.flags[0].unknown_serial);
        assert!(outcome.flags[1].unknown_serial);
    }

    #[test]
    fn test_skipped_check_distinct_from_zero_found() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let mut records = vec![record("SN001", "", "X")];
        let outcome = auditor.audit(&mut records, None);

        assert!(!outcome.serial_check_performed);
        assert_eq!(outcome.unknown_serials, 0);
    }

    #[test]
    fn test_flags_accumulate_across_passes() {
        let config = Config::default();
        let auditor = AnomalyAuditor::new(&config);

        let master: HashSet<String> = HashSet::new();
        let mut records = vec![
            record("GHOST", "01/05/2024", ""),
            record("GHOST2", "01/06/2024", "B1"),
            record("GHOST3", "03/01/2024", "B1"),
        ];
        let outcome = auditor.audit(&mut records, Some(&master));

        // first row: missing location + unknown serial at once
        assert!(outcome.flags[0].missing_location);
        assert!(outcome.flags[0].unknown_serial);
        assert!(!outcome.flags[0].date_outlier);
        // third row: outlier + unknown serial
        assert!(outcome.flags[2].date_outlier);
        assert!(outcome.flags[2].unknown_serial);
        assert_eq!(outcome.flags[0].labels(), vec!["missing location", "unknown serial"]);
    }

    #[test]
    fn test_load_master_list_skips_header_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Serial Number").unwrap();
        writeln!(file, "SN001").unwrap();
        writeln!(file, "  SN002  ").unwrap();
        writeln!(file, "").unwrap();

        let set = load_master_list(file.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("SN001"));
        assert!(set.contains("SN002"));
    }
}
