// 📄 Report Output - Final table and summary text
// Writes the canonical CSV with a Review Flags column and builds the
// plain-text run summary

use anyhow::{ensure, Context as AnyhowContext, Result};
use std::path::Path;

use crate::audit::{AuditOutcome, FlagSet};
use crate::record::{Record, CANONICAL_COLUMNS};
use crate::stats::Stats;

/// How many yielded-nothing identifiers the summary samples
const EMPTY_SAMPLE_LIMIT: usize = 5;

// ============================================================================
// CSV EXPORT
// ============================================================================

/// Write the final record set as CSV: the ten canonical columns in order,
/// plus a trailing Review Flags column carrying each row's audit flags.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    records: &[Record],
    flags: &[FlagSet],
) -> Result<()> {
    ensure!(
        records.len() == flags.len(),
        "flag set out of step with record set: {} records, {} flag rows",
        records.len(),
        flags.len()
    );

    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to create output file: {:?}", path.as_ref()))?;

    let mut header: Vec<&str> = CANONICAL_COLUMNS.to_vec();
    header.push("Review Flags");
    writer.write_record(&header)?;

    for (record, flag) in records.iter().zip(flags) {
        let mut row: Vec<String> = record.values().iter().map(|v| v.to_string()).collect();
        row.push(flag.labels().join("; "));
        writer.write_record(&row)?;
    }

    writer.flush().context("Failed to flush output file")?;
    Ok(())
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Build the end-of-run summary block shown to the user
pub fn summary(
    output_name: &str,
    records: &[Record],
    stats: &Stats,
    outcome: &AuditOutcome,
) -> String {
    let mut lines = vec![
        format!("Done! Written to {}", output_name),
        String::new(),
        format!("Rows Written: {}", records.len()),
        format!("Messages Processed: {}", stats.total_messages),
        format!("Workflow Messages: {}", stats.workflow_messages),
        format!("Empty Messages: {}", stats.yielded_nothing.len()),
        String::new(),
        format!("Corrections Applied: {}", outcome.corrections_applied),
        format!("Date Outliers: {}", outcome.date_outliers),
        format!("Missing Locations: {}", outcome.missing_locations),
    ];

    if outcome.serial_check_performed {
        lines.push(format!("Unknown Serials: {}", outcome.unknown_serials));
    } else {
        lines.push("Serial Check: Skipped".to_string());
    }

    if !stats.yielded_nothing.is_empty() {
        lines.push(String::new());
        lines.push("Messages with no data (sample):".to_string());
        for id in stats.yielded_nothing.iter().take(EMPTY_SAMPLE_LIMIT) {
            lines.push(format!("- {}", id));
        }
    }

    lines.join("\n")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn outcome(flags: Vec<FlagSet>) -> AuditOutcome {
        AuditOutcome {
            flags,
            corrections_applied: 0,
            missing_locations: 0,
            date_outliers: 0,
            unknown_serials: 0,
            consensus_period: None,
            serial_check_performed: false,
        }
    }

    #[test]
    fn test_csv_has_canonical_columns_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let records = vec![Record {
            serial_number: "A1".to_string(),
            device_model: "MacBook".to_string(),
            ..Record::default()
        }];
        let flags = vec![FlagSet {
            date_outlier: true,
            unknown_serial: true,
            ..FlagSet::default()
        }];

        write_csv(&path, &records, &flags).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();

        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "Serial Number,Device Model,P.O. Number,Device Owner,Computer Name,\
             Date of Latest Change,Changed By,Location,Classification,Comments,Review Flags"
        );

        let row = lines.next().unwrap();
        assert!(row.starts_with("A1,MacBook,"));
        assert!(row.ends_with("date outlier; unknown serial"));
    }

    #[test]
    fn test_csv_rejects_mismatched_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let records = vec![Record::default()];
        assert!(write_csv(&path, &records, &[]).is_err());
    }

    #[test]
    fn test_summary_distinguishes_skipped_serial_check() {
        let stats = Stats::new();

        let skipped = summary("out.csv", &[], &stats, &outcome(Vec::new()));
        assert!(skipped.contains("Serial Check: Skipped"));
        assert!(!skipped.contains("Unknown Serials"));

        let mut performed = outcome(Vec::new());
        performed.serial_check_performed = true;
        let performed = summary("out.csv", &[], &stats, &performed);
        assert!(performed.contains("Unknown Serials: 0"));
        assert!(!performed.contains("Skipped"));
    }

    #[test]
    fn test_summary_samples_empty_messages() {
        let mut stats = Stats::new();
        stats.yielded_nothing = (0..8).map(|i| format!("msg_{}.json", i)).collect();

        let text = summary("out.csv", &[], &stats, &outcome(Vec::new()));

        assert!(text.contains("Empty Messages: 8"));
        assert!(text.contains("- msg_0.json"));
        assert!(text.contains("- msg_4.json"));
        assert!(!text.contains("- msg_5.json"));
    }
}
