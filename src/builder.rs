// 🏗️ Source Record Builder - One message in, candidate records out
// Attachment rows and workflow forms both land on the canonical schema here

use chrono::{NaiveDate, Utc};
use tracing::{error, warn};

use crate::config::Config;
use crate::extract::{clean_name, extract_field};
use crate::message::{Attachment, Message};
use crate::record::{Record, RowValidator};
use crate::stats::Stats;

// ============================================================================
// MESSAGE YIELD
// ============================================================================

/// What one message contributed to the batch.
///
/// Attachment-derived and body-derived records stay in separate groups
/// until the assembler merges them, each group cleaned on its own terms.
#[derive(Debug, Clone, Default)]
pub struct MessageYield {
    pub attachment_records: Vec<Record>,
    pub workflow_record: Option<Record>,
}

impl MessageYield {
    pub fn is_empty(&self) -> bool {
        self.attachment_records.is_empty() && self.workflow_record.is_none()
    }
}

// ============================================================================
// SOURCE RECORD BUILDER
// ============================================================================

pub struct SourceRecordBuilder<'a> {
    config: &'a Config,
    validator: RowValidator,
}

impl<'a> SourceRecordBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        SourceRecordBuilder {
            validator: RowValidator::new(&config.junk_serials),
            config,
        }
    }

    /// Convert one message into candidate records, updating stats.
    ///
    /// A bad attachment contributes nothing but never aborts the message;
    /// the message keeps whatever its other attachments and body yield.
    pub fn process(&self, message: &Message, stats: &mut Stats) -> MessageYield {
        stats.total_messages += 1;

        let sender = message.sender_or_unknown();
        let mut result = MessageYield::default();
        let mut saw_table = false;

        for attachment in &message.attachments {
            if !attachment.is_tabular() {
                continue;
            }
            saw_table = true;

            match self.attachment_rows(message, attachment, &sender) {
                Some(mut rows) => result.attachment_records.append(&mut rows),
                None => error!(
                    source = %message.source_id,
                    attachment = %attachment.filename,
                    error = attachment.decode_error.as_deref().unwrap_or("no decoded table"),
                    "Skipping unreadable attachment"
                ),
            }
        }

        if saw_table {
            stats.with_table += 1;
        } else {
            stats.no_table += 1;
        }

        if self.is_workflow_subject(&message.subject) {
            stats.workflow_messages += 1;
            result.workflow_record = self.workflow_record(message, &sender);
            if result.workflow_record.is_some() {
                stats.entries_created += 1;
            }
        }

        if result.is_empty() {
            stats.yielded_nothing.push(message.source_id.clone());
        }

        result
    }

    /// Load and process one message file.
    ///
    /// A file that fails to open or parse still counts as a processed
    /// message: it lands in the no-table bucket and the yielded-nothing
    /// list, and the loop moves on.
    pub fn process_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
        stats: &mut Stats,
    ) -> MessageYield {
        let path = path.as_ref();
        match Message::from_file(path) {
            Ok(message) => self.process(&message, stats),
            Err(e) => {
                error!(file = %path.display(), error = %e, "Failed to open message");
                stats.total_messages += 1;
                stats.no_table += 1;
                stats.yielded_nothing.push(
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                );
                MessageYield::default()
            }
        }
    }

    fn is_workflow_subject(&self, subject: &str) -> bool {
        subject
            .to_lowercase()
            .contains(&self.config.workflow_subject_key.to_lowercase())
    }

    // ------------------------------------------------------------------------
    // Attachment rows
    // ------------------------------------------------------------------------

    /// All valid rows of one decoded attachment, with fill-down defaults
    /// applied to the date and changed-by columns
    fn attachment_rows(
        &self,
        message: &Message,
        attachment: &Attachment,
        sender: &str,
    ) -> Option<Vec<Record>> {
        if attachment.decode_error.is_some() {
            return None;
        }
        let table = attachment.table.as_ref()?;

        let fallback_date = attachment_date(message, attachment)
            .format(&self.config.date_format)
            .to_string();

        let mut records = Vec::with_capacity(table.rows.len());
        for row in 0..table.rows.len() {
            let cell = |header: &str| {
                table
                    .cell(row, header)
                    .map(str::to_string)
                    .unwrap_or_default()
            };

            let mut record = Record {
                serial_number: cell("Serial Number"),
                device_model: cell("Device Model"),
                po_number: cell("P.O. Number"),
                device_owner: cell("Device Owner"),
                computer_name: cell("Computer Name"),
                date_of_latest_change: cell("Date of Latest Change"),
                changed_by: cell("Changed By"),
                location: cell("Location"),
                classification: cell("Classification"),
                comments: cell("Comments"),
            };

            // fill-down only; present values are never overwritten
            if record.date_of_latest_change.trim().is_empty() {
                record.date_of_latest_change = fallback_date.clone();
            }
            if record.changed_by.trim().is_empty() {
                record.changed_by = sender.to_string();
            }

            records.push(record);
        }

        let records = self.validator.retain_valid(records);
        if records.is_empty() {
            warn!(
                source = %message.source_id,
                attachment = %attachment.filename,
                "Attachment produced no valid rows"
            );
        }
        Some(records)
    }

    // ------------------------------------------------------------------------
    // Workflow record
    // ------------------------------------------------------------------------

    /// At most one record extracted from the body of a workflow-form
    /// message. No usable serial means no record at all.
    fn workflow_record(&self, message: &Message, sender: &str) -> Option<Record> {
        let labels = &self.config.workflow_labels;
        let body = &message.body;

        let serial = extract_field(body, &labels.serial)?;
        if !self.validator.is_valid_serial(&serial) {
            return None;
        }

        let placeholder = &self.config.workflow_default;
        let field =
            |label: &str| extract_field(body, label).unwrap_or_else(|| placeholder.clone());

        Some(Record {
            serial_number: serial.trim().to_string(),
            device_model: field(&labels.model),
            po_number: String::new(),
            device_owner: field(&labels.owner),
            computer_name: placeholder.clone(),
            date_of_latest_change: field(&labels.date),
            changed_by: extract_field(body, &labels.staff)
                .as_deref()
                .and_then(clean_name)
                .unwrap_or_else(|| sender.to_string()),
            location: extract_field(body, &labels.room)
                .unwrap_or_else(|| self.config.workflow_no_room.clone()),
            classification: placeholder.clone(),
            comments: String::new(),
        })
    }
}

// ============================================================================
// ATTACHMENT DATE FALLBACK
// ============================================================================

/// Best-effort date for an attachment, probed in priority order:
/// attachment modified -> attachment created -> message timestamp ->
/// source-file mtime -> today. First hit wins.
fn attachment_date(message: &Message, attachment: &Attachment) -> NaiveDate {
    [
        attachment.modified,
        attachment.created,
        message.date,
        message.file_modified,
    ]
    .into_iter()
    .flatten()
    .next()
    .map(|ts| ts.date_naive())
    .unwrap_or_else(|| Utc::now().date_naive())
}

// ============================================================================
// TESTS
// ============================================================================
