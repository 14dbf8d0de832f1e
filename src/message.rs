// ✉️ Message Boundary - Plain-data view of one input message
// Container parsing and attachment decoding happen upstream; this module
// only models what they hand over, plus best-effort sender resolution

use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::extract::clean_name;

// ============================================================================
// DECODED TABLE
// ============================================================================

/// A spreadsheet-like attachment after decoding: a header row plus rows of
/// text cells, keyed by header name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DecodedTable {
    /// Case-insensitive header lookup
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(header))
    }

    /// Cell by row index and header name; missing column or short row
    /// yields None
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.column_index(header)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

// ============================================================================
// ATTACHMENT
// ============================================================================

/// One attachment payload as delivered by the decoding collaborator.
///
/// `table` is present when decoding succeeded; `decode_error` carries the
/// collaborator's failure message otherwise. A decode failure never fails
/// the message, let alone the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,

    #[serde(default)]
    pub table: Option<DecodedTable>,

    #[serde(default)]
    pub decode_error: Option<String>,

    /// Attachment metadata timestamps, when the container recorded them
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Attachment {
    /// True for filenames the pipeline treats as tabular payloads
    pub fn is_tabular(&self) -> bool {
        let lower = self.filename.to_lowercase();
        lower.ends_with(".xlsx") || lower.ends_with(".xlsm") || lower.ends_with(".xls")
    }
}

// ============================================================================
// MESSAGE
// ============================================================================

/// One input message, fully materialized as plain data.
///
/// The several sender slots mirror what different container formats
/// expose; resolution probes them in a fixed priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Identifier used in stats and the yielded-nothing list, by
    /// convention the source filename
    #[serde(default)]
    pub source_id: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default)]
    pub sender_name: Option<String>,

    #[serde(default)]
    pub sender_email: Option<String>,

    #[serde(default)]
    pub from: Option<String>,

    /// Raw header block, used as the last-resort sender source
    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Filesystem mtime of the source file, filled in by the driver;
    /// one link in the attachment-date fallback chain
    #[serde(skip)]
    pub file_modified: Option<DateTime<Utc>>,
}

/// Sender-resolution capability at the message boundary.
///
/// Concrete adapters hide their own attribute probing behind this single
/// operation.
pub trait MessageSource {
    /// Best-effort sender display name
    fn resolve_sender(&self) -> Option<String>;
}

impl MessageSource for Message {
    fn resolve_sender(&self) -> Option<String> {
        // ordered resolver chain, first non-absent hit wins
        let resolvers: [fn(&Message) -> Option<String>; 5] = [
            |m| m.sender.as_deref().and_then(clean_name),
            |m| m.sender_name.as_deref().and_then(clean_name),
            |m| m.sender_email.as_deref().and_then(clean_name),
            |m| m.from.as_deref().and_then(clean_name),
            |m| m.sender_from_header(),
        ];

        resolvers.iter().find_map(|resolve| resolve(self))
    }
}

impl Message {
    /// Resolved sender, or the stock fallback when every source is empty
    pub fn sender_or_unknown(&self) -> String {
        self.resolve_sender()
            .unwrap_or_else(|| "Unknown Sender".to_string())
    }

    fn sender_from_header(&self) -> Option<String> {
        let header = self.header.as_deref()?;
        let re = Regex::new(r"(?im)^from:[ \t]*(.+)$").ok()?;
        let caps = re.captures(header)?;
        clean_name(caps.get(1)?.as_str())
    }

    /// Load one message from a JSON file written by the container-parsing
    /// collaborator. Records the file mtime for the date fallback chain.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read message file: {:?}", path))?;

        let mut message: Message = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse message file: {:?}", path))?;

        if message.source_id.is_empty() {
            message.source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        message.file_modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(message)
    }
}

// ============================================================================
// TESTS
// ============================================================================
