// ⚙️ Run Configuration - Configuration as Data
// Filter lists, correction table, and workflow form labels for one batch run

use anyhow::{Context as AnyhowContext, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// ============================================================================
// CONFIG
// ============================================================================

/// Everything about a run that is data, not code.
///
/// Defaults reproduce the stock behavior; a JSON file can override any
/// subset of fields (missing fields fall back to defaults via serde).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output format for the canonical date column
    pub date_format: String,

    /// Placeholder for workflow-form fields that could not be extracted
    pub workflow_default: String,

    /// Placeholder for a workflow form with no room/location
    pub workflow_no_room: String,

    /// Subject must contain this (case-insensitive) to be treated as a
    /// workflow form
    pub workflow_subject_key: String,

    /// Body labels the workflow extractor looks for
    pub workflow_labels: WorkflowLabels,

    /// Serial values considered junk (case-insensitive); the empty string
    /// is always junk regardless of this list
    pub junk_serials: Vec<String>,

    /// Device-model fragments to exclude (case-insensitive substring match)
    pub ignore_models: Vec<String>,

    /// Exact serial values to exclude, e.g. header rows captured as data
    pub ignore_serials: Vec<String>,

    /// Location prefix corrections, applied in order, first match wins
    pub corrections: Vec<(String, String)>,

    /// Device models matching this pattern sort to the top of the report
    pub priority_models: String,
}

/// Field labels expected in a workflow-form email body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLabels {
    pub serial: String,
    pub model: String,
    pub owner: String,
    pub date: String,
    pub staff: String,
    pub room: String,
}

impl Default for WorkflowLabels {
    fn default() -> Self {
        WorkflowLabels {
            serial: "Serial Number".to_string(),
            model: "Model".to_string(),
            owner: "Full Name".to_string(),
            date: "Date".to_string(),
            staff: "Staff Name".to_string(),
            room: "Room".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            date_format: "%m/%d/%Y".to_string(),
            workflow_default: "N/A, Workflow".to_string(),
            workflow_no_room: "NA".to_string(),
            workflow_subject_key: "Inventory Change Form".to_string(),
            workflow_labels: WorkflowLabels::default(),
            junk_serials: vec![
                "nan".to_string(),
                "none".to_string(),
                "null".to_string(),
                "n/a".to_string(),
                "serial number".to_string(),
            ],
            ignore_models: Vec::new(),
            ignore_serials: vec![
                "Common Classification Cheat Sheet".to_string(),
                "Serial Number".to_string(),
            ],
            corrections: Vec::new(),
            priority_models: "macbook|imac|iphone|ipad|apple".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Compile the model-exclusion pattern.
    ///
    /// Fragments are escaped and joined, so config entries are plain
    /// substrings, not regex. No fragments means nothing is excluded.
    pub fn model_exclusion_regex(&self) -> Result<Option<Regex>> {
        let fragments: Vec<String> = self
            .ignore_models
            .iter()
            .map(|m| regex::escape(m.trim()))
            .filter(|m| !m.is_empty())
            .collect();

        if fragments.is_empty() {
            return Ok(None);
        }

        let re = RegexBuilder::new(&fragments.join("|"))
            .case_insensitive(true)
            .build()
            .context("Failed to compile model exclusion pattern")?;

        Ok(Some(re))
    }

    /// Compile the priority-model pattern (full regex, case-insensitive)
    pub fn priority_regex(&self) -> Result<Regex> {
        RegexBuilder::new(&self.priority_models)
            .case_insensitive(true)
            .build()
            .context("Failed to compile priority model pattern")
    }

    /// Location values that mean "no location recorded"
    pub fn skip_locations(&self) -> HashSet<String> {
        let mut set: HashSet<String> = ["", "NA", "N/A", "NONE", "NULL"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        set.insert(self.workflow_default.to_uppercase());
        set
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.date_format, "%m/%d/%Y");
        assert_eq!(config.workflow_default, "N/A, Workflow");
        assert!(config.ignore_models.is_empty());
        assert!(config
            .ignore_serials
            .contains(&"Serial Number".to_string()));
    }

    #[test]
    fn test_no_exclusions_means_no_pattern() {
        let config = Config::default();
        assert!(config.model_exclusion_regex().unwrap().is_none());
    }

    #[test]
    fn test_model_exclusion_is_escaped_substring() {
        let config = Config {
            ignore_models: vec!["printer (old)".to_string(), "projector".to_string()],
            ..Config::default()
        };

        let re = config.model_exclusion_regex().unwrap().unwrap();
        assert!(re.is_match("HP Printer (old) v2"));
        assert!(re.is_match("EPSON PROJECTOR"));
        assert!(!re.is_match("MacBook Pro"));
    }

    #[test]
    fn test_priority_regex_matches_apple_family() {
        let config = Config::default();
        let re = config.priority_regex().unwrap();

        assert!(re.is_match("MacBook Pro 16"));
        assert!(re.is_match("APPLE IPAD"));
        assert!(!re.is_match("ThinkPad X1"));
    }

    #[test]
    fn test_skip_locations_include_workflow_default() {
        let config = Config::default();
        let skip = config.skip_locations();

        assert!(skip.contains(""));
        assert!(skip.contains("N/A"));
        assert!(skip.contains("N/A, WORKFLOW"));
        assert!(!skip.contains("BLDG1"));
    }

    #[test]
    fn test_partial_config_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "workflow_subject_key": "Asset Update", "corrections": [["BLD1", "BLDG1"]] }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.workflow_subject_key, "Asset Update");
        assert_eq!(
            config.corrections,
            vec![("BLD1".to_string(), "BLDG1".to_string())]
        );
        // untouched fields keep defaults
        assert_eq!(config.date_format, "%m/%d/%Y");
    }
}
