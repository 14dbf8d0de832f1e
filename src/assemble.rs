// 🧹 Batch Assembler - Merge, clean, dedup, and order the batch
// Attachment and workflow groups are cleaned separately, then combined

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use crate::config::Config;
use crate::extract::normalize_date;
use crate::record::{Record, RowValidator};

// ============================================================================
// EMPTY BATCH
// ============================================================================

/// Terminal condition: nothing survived filtering. The driver reports
/// "no data" instead of writing an empty output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBatch;

impl fmt::Display for EmptyBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no valid records left after cleaning")
    }
}

impl std::error::Error for EmptyBatch {}

// ============================================================================
// BATCH ASSEMBLER
// ============================================================================

pub struct BatchAssembler<'a> {
    config: &'a Config,
    validator: RowValidator,
    model_exclusion: Option<Regex>,
    serial_exclusions: HashSet<String>,
}

impl<'a> BatchAssembler<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(BatchAssembler {
            validator: RowValidator::new(&config.junk_serials),
            model_exclusion: config.model_exclusion_regex()?,
            serial_exclusions: config
                .ignore_serials
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            config,
        })
    }

    /// Combine both record groups into the final canonical table.
    ///
    /// Each group is cleaned independently, then the merged set is
    /// revalidated and exact duplicates are dropped (first occurrence
    /// wins, order preserved). An empty result is the EmptyBatch
    /// terminal condition, never an empty table.
    pub fn assemble(
        &self,
        attachment_records: Vec<Record>,
        workflow_records: Vec<Record>,
    ) -> Result<Vec<Record>> {
        let mut merged = self.clean_group(attachment_records);
        merged.extend(self.clean_group(workflow_records));

        // defense in depth: the groups were validated, the merge is too
        let merged = self.validator.retain_valid(merged);
        let merged = dedup_structural(merged);

        if merged.is_empty() {
            return Err(EmptyBatch.into());
        }
        Ok(merged)
    }

    /// Per-group cleaning: blank rows, excluded models, excluded serials,
    /// junk serials, then date normalization
    fn clean_group(&self, records: Vec<Record>) -> Vec<Record> {
        let mut kept: Vec<Record> = records
            .into_iter()
            .filter(|r| !r.is_blank())
            .filter(|r| {
                self.model_exclusion
                    .as_ref()
                    .map_or(true, |re| !re.is_match(&r.device_model))
            })
            .filter(|r| {
                !self
                    .serial_exclusions
                    .contains(&r.serial_number.trim().to_lowercase())
            })
            .filter(|r| self.validator.is_valid_serial(&r.serial_number))
            .collect();

        for record in &mut kept {
            record.date_of_latest_change = normalize_date(
                &record.date_of_latest_change,
                &self.config.date_format,
            )
            .into_string();
        }

        kept
    }
}

/// Drop exact whole-record duplicates, keeping the first occurrence
fn dedup_structural(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.fingerprint()))
        .collect()
}

// ============================================================================
// PRIORITY SORTER
// ============================================================================

/// Stable partition: priority device models first, everything else after,
/// original relative order untouched inside both buckets
pub struct PrioritySorter {
    pattern: Regex,
}

impl PrioritySorter {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(PrioritySorter {
            pattern: config.priority_regex()?,
        })
    }

    pub fn sort(&self, records: Vec<Record>) -> Vec<Record> {
        // Vec::partition preserves relative order in both halves, which
        // is the whole contract here
        let (mut priority, rest): (Vec<Record>, Vec<Record>) = records
            .into_iter()
            .partition(|r| self.pattern.is_match(&r.device_model));

        priority.extend(rest);
        priority
    }
}

// ============================================================================
// TESTS
// ============================================================================
