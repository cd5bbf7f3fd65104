//! # psynorm-assert
//!
//! Validates that a generated report document and its share document agree
//! before publication. The checklist is linear and fail-fast:
//!
//! ```text
//! ok flags → content_pack_id → trait cards → share_id → attempt_id
//!          → type_code → identity locale → content-pack substring
//! ```
//!
//! Fields that may live in several places are resolved through ordered
//! [`resolve::FieldChain`]s. Exit codes separate inconsistent documents
//! ([`EXIT_INCONSISTENT`]) from unreadable ones ([`EXIT_UNREADABLE`]).

pub mod check;
pub mod document;
pub mod resolve;

pub use check::{
    ASSERT_REPORT_KIND, AssertError, AssertFailure, AssertReport, CheckStep,
    ConsistencyExpectations, ConsistencyFailure, ConsistencyVerdict, DEFAULT_EXPECT_LOCALE,
    EXIT_CONSISTENT, EXIT_INCONSISTENT, EXIT_UNREADABLE, FailureKind, assert_report_files,
    check_consistency,
};
pub use document::{DocumentError, load_document, parse_document};
pub use resolve::{Candidate, Documents, FieldChain, Resolved, Side, scalar_text};
