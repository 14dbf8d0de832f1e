// 🔎 Field Extraction - Pull structured values out of free text
// Label lookup in email bodies, name cleanup, and date coercion

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::RegexBuilder;

// ============================================================================
// FIELD EXTRACTOR
// ============================================================================

/// Find the value for `label` in a free-text block.
///
/// Matching is line-oriented and case-insensitive: the first line starting
/// with `label` followed by a colon wins. Text after the colon on the same
/// line is the value; with nothing after the colon, the value is the next
/// line - unless that next line is blank, which ends the lookahead.
///
/// Only the first occurrence of the label is consulted. A label string that
/// also appears inside another field's value can therefore mis-extract;
/// callers rely on misses being reproducible, so this stays as-is.
pub fn extract_field(body: &str, label: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let pattern = format!(r"(?m)^{}[ \t]*:[ \t]*(.*)$", regex::escape(label));
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?;

    let caps = re.captures(body)?;

    // value on the same line as the label
    let inline = caps.get(1).map_or("", |m| m.as_str()).trim();
    if !inline.is_empty() {
        return Some(inline.to_string());
    }

    // single-line lookahead: the very next line, blank means no value
    let tail = &body[caps.get(0)?.end()..];
    let next = tail.strip_prefix('\n')?.lines().next()?.trim();
    if next.is_empty() {
        return None;
    }
    Some(next.to_string())
}

// ============================================================================
// NAME NORMALIZER
// ============================================================================

/// Clean up a name as it appears in email headers.
///
/// `"Doe, John" <jdoe@example.com>` becomes `John Doe`. Returns None when
/// nothing name-like survives the cleanup.
pub fn clean_name(raw: &str) -> Option<String> {
    let mut s = raw.trim();

    // drop the <address> part, keep the display name
    if let Some(idx) = s.find('<') {
        s = s[..idx].trim();
    }

    // quote-strip after the cut, so a quote that sat against the address
    // part does not survive
    let s = s.trim_matches(|c| c == '"' || c == '\'').trim();

    if s.is_empty() {
        return None;
    }

    // "Last, First" -> "First Last"; only the first comma splits, any
    // remainder stays attached to the surname side
    if let Some((last, first)) = s.split_once(',') {
        return Some(format!("{} {}", first.trim(), last.trim()));
    }

    Some(s.to_string())
}

// ============================================================================
// DATE NORMALIZER
// ============================================================================

/// Outcome of a date normalization attempt.
///
/// Unparsable input is never an error here: it passes through untouched and
/// downstream consumers (consensus detection, the report) tolerate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// Parsed and reformatted to the canonical pattern
    Normalized(String),
    /// Left exactly as received
    Passthrough(String),
}

impl DateOutcome {
    pub fn into_string(self) -> String {
        match self {
            DateOutcome::Normalized(s) => s,
            DateOutcome::Passthrough(s) => s,
        }
    }
}

/// Accepted date layouts, tried in order. First hit wins.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%m/%d/%y", "%d %b %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Parse a date-like string into a NaiveDate, best effort
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    None
}

/// Coerce a date-like value to the canonical output format
pub fn normalize_date(value: &str, format: &str) -> DateOutcome {
    match parse_date(value) {
        Some(d) => DateOutcome::Normalized(d.format(format).to_string()),
        None => DateOutcome::Passthrough(value.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
