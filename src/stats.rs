// 📊 Stats Collector - Batch-wide counters
// Owned by the driver, passed &mut through the loop, read once at report time

use serde::{Deserialize, Serialize};

/// Counters accumulated across one batch run.
///
/// Never module-level state: the driver owns one instance and threads it
/// through message processing by mutable reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Messages seen, including ones that failed to open
    pub total_messages: usize,

    /// Messages that carried at least one tabular attachment
    pub with_table: usize,

    /// Messages whose subject matched the workflow marker
    pub workflow_messages: usize,

    /// Messages without any tabular attachment
    pub no_table: usize,

    /// Workflow records created from body text
    pub entries_created: usize,

    /// Identifiers of messages that produced no record at all
    pub yielded_nothing: Vec<String>,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }
}
