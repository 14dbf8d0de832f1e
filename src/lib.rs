// Inventory Handler - Core Library
// Batch pipeline: messages -> candidate records -> assembled table -> audit

pub mod assemble;
pub mod audit;
pub mod builder;
pub mod config;
pub mod extract;
pub mod logging;
pub mod message;
pub mod record;
pub mod report;
pub mod stats;

// Re-export the pipeline surface
pub use assemble::{BatchAssembler, EmptyBatch, PrioritySorter};
pub use audit::{load_master_list, AnomalyAuditor, AuditOutcome, FlagSet};
pub use builder::{MessageYield, SourceRecordBuilder};
pub use config::{Config, WorkflowLabels};
pub use extract::{clean_name, extract_field, normalize_date, parse_date, DateOutcome};
pub use message::{Attachment, DecodedTable, Message, MessageSource};
pub use record::{Record, RowValidator, CANONICAL_COLUMNS};
pub use stats::Stats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
