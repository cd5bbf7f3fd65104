//! # psynorm-table
//!
//! Storage layer for the shared norms table.
//!
//! This crate provides:
//! - a small RFC-4180 CSV codec (`csv`)
//! - `NormsTable`, the canonical in-memory table with atomic file writes
//! - `merge_group`, the pure replace-by-group-then-resort upsert
//! - attempt-level input parsing (`attempts`)
//! - a completeness audit over a whole table (`check`)
//!
//! ## Data model
//!
//! ```text
//! seed CSV (on disk, 18 fixed columns)
//!     ↕  load / save (atomic rename)
//! NormsTable (deterministically sorted rows)
//! ```

pub mod attempts;
pub mod check;
pub mod csv;
pub mod merge;
pub mod table;

pub use attempts::{AttemptRecord, AttemptSet, QUALITY_COLUMN, load_attempts, parse_attempts};
pub use check::{
    FAILURE_CLASS_DUPLICATE_METRIC, FAILURE_CLASS_GROUP_INCOMPLETE,
    FAILURE_CLASS_REQUIRED_GROUP_MISSING, FAILURE_CLASS_SD_NOT_POSITIVE, TABLE_CHECK_KIND,
    TableCheckReport, TableCheckSummary, TableFinding, WARNING_CLASS_FOREIGN_GROUP, check_table,
};
pub use csv::{CsvDocument, CsvError, CsvRecord, parse_csv, render_record};
pub use merge::{MergeSummary, merge_group};
pub use table::{
    NormsTable, StagedFile, read_text_if_exists, stage_bytes, write_bytes_atomic,
};
