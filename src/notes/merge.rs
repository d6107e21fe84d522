//! Merging a new release entry into a release document

use crate::notes::document::{Block, ReleaseDocument};
use chrono::{Local, NaiveDateTime};

/// Document used when the existing notes are empty or missing
pub const DEFAULT_DOCUMENT: &str = "# Release Log\n\n";

/// Timestamp format written under each version heading
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of wall-clock time for release entries
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Merge a release entry into `document` using the system clock
pub fn merge(document: &str, version: &str, records: &[String]) -> String {
    merge_at(document, version, records, &SystemClock)
}

/// Merge a release entry into `document`, reading the timestamp from `clock`
///
/// The entry (version heading, timestamp line, numbered records) is inserted
/// right after the title block. Nothing already in the document is moved
/// relative to anything else or altered.
pub fn merge_at(document: &str, version: &str, records: &[String], clock: &dyn Clock) -> String {
    merge_with_default(document, DEFAULT_DOCUMENT, version, records, clock)
}

/// Same as [`merge_at`], with a caller-supplied fallback for an empty document
pub fn merge_with_default(
    document: &str,
    default_document: &str,
    version: &str,
    records: &[String],
    clock: &dyn Clock,
) -> String {
    let source = if document.trim().is_empty() {
        default_document
    } else {
        document
    };

    let mut doc = ReleaseDocument::parse(source);
    let entry = entry_blocks(version, &clean_records(records), clock);
    doc.insert_blocks(1, entry);
    doc.render()
}

/// Version heading text, `## v1.2.3`
pub fn version_heading(version: &str) -> String {
    if version.starts_with('v') || version.starts_with('V') {
        format!("## {}", version)
    } else {
        format!("## v{}", version)
    }
}

fn entry_blocks(version: &str, records: &[String], clock: &dyn Clock) -> Vec<Block> {
    let timestamp = clock.now().format(TIMESTAMP_FORMAT);

    let mut blocks = vec![
        Block::new(version_heading(version), 1),
        Block::new(format!("**Release time: {}**", timestamp), 1),
    ];

    let count = records.len();
    for (i, record) in records.iter().enumerate() {
        let blank_after = if i + 1 == count { 1 } else { 0 };
        blocks.push(Block::new(format!("{}. {}", i + 1, record), blank_after));
    }

    blocks
}

/// Drop blank records and strip leading `N.` ordinals and whitespace
///
/// Applying this twice gives the same result as applying it once.
pub fn clean_records(records: &[String]) -> Vec<String> {
    records
        .iter()
        .map(|r| clean_record(r))
        .filter(|r| !r.is_empty())
        .collect()
}

fn clean_record(record: &str) -> String {
    let mut rest = record.trim();
    while let Some(stripped) = strip_ordinal(rest) {
        rest = stripped.trim();
    }
    rest.to_string()
}

/// `"12. text"` -> `Some(" text")`, `"1.text"` -> `Some("text")`; `"1.0.0 text"` -> `None`
fn strip_ordinal(text: &str) -> Option<&str> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let after = text[digits..].strip_prefix('.')?;
    match after.chars().next() {
        Some(c) if c.is_ascii_digit() => None,
        _ => Some(after),
    }
}
