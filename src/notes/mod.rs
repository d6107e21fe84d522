//! Release notes - the Markdown release log and how new entries are merged in
//!
//! A release log is a Markdown document whose first block is a title. Each
//! release prepends an entry (version heading, timestamp, numbered changes)
//! directly below the title, so the newest release is always on top.

pub mod document;
pub mod merge;

pub use document::{Block, BlockKind, LineEnding, ReleaseDocument};
pub use merge::{
    clean_records, merge, merge_at, merge_with_default, version_heading, Clock, FixedClock,
    SystemClock, DEFAULT_DOCUMENT, TIMESTAMP_FORMAT,
};
