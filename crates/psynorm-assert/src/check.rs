//! The fail-fast consistency checklist.

use crate::document::{DocumentError, load_document};
use crate::resolve::{
    CONTENT_PACK_ID, Candidate, Documents, FieldChain, IDENTITY_LOCALE, REPORT_ATTEMPT_ID,
    REPORT_OK, REPORT_TYPE_CODE, SHARE_ATTEMPT_ID, SHARE_ID, SHARE_OK, SHARE_TYPE_CODE,
    TRAIT_CARDS,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

pub const ASSERT_REPORT_KIND: &str = "psynorm.assert_report.v1";
pub const DEFAULT_EXPECT_LOCALE: &str = "zh-CN";

pub const EXIT_CONSISTENT: i32 = 0;
pub const EXIT_INCONSISTENT: i32 = 1;
pub const EXIT_UNREADABLE: i32 = 2;

/// Checklist positions, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStep {
    DocumentsOk,
    ContentPackId,
    TraitCards,
    ShareId,
    AttemptId,
    TypeCode,
    Locale,
    ContentPackSubstring,
}

impl CheckStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentsOk => "documents_ok",
            Self::ContentPackId => "content_pack_id",
            Self::TraitCards => "trait_cards",
            Self::ShareId => "share_id",
            Self::AttemptId => "attempt_id",
            Self::TypeCode => "type_code",
            Self::Locale => "locale",
            Self::ContentPackSubstring => "content_pack_substring",
        }
    }
}

impl fmt::Display for CheckStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("{document}.ok != true (got {actual})")]
    NotOk { document: String, actual: String },

    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("{field} mismatch: share={share} report={report}")]
    Inconsistency {
        field: String,
        share: String,
        report: String,
    },

    #[error("{field} unexpected: got {actual} (expect {expected})")]
    Unexpected {
        field: String,
        expected: String,
        actual: String,
    },
}

impl FailureKind {
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotOk { .. } => "not_ok",
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::Inconsistency { .. } => "inconsistency",
            Self::Unexpected { .. } => "unexpected",
        }
    }
}

/// The first check that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step}: {kind}")]
pub struct ConsistencyFailure {
    pub step: CheckStep,
    pub kind: FailureKind,
}

impl ConsistencyFailure {
    fn new(step: CheckStep, kind: FailureKind) -> Self {
        Self { step, kind }
    }

    fn missing(step: CheckStep, field: impl Into<String>) -> Self {
        Self::new(
            step,
            FailureKind::MissingRequiredField {
                field: field.into(),
            },
        )
    }
}

/// Caller-supplied expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyExpectations {
    pub locale: String,
    /// Substring the content-pack id must contain; blank disables the check.
    pub content_pack_substring: Option<String>,
}

impl Default for ConsistencyExpectations {
    fn default() -> Self {
        Self {
            locale: DEFAULT_EXPECT_LOCALE.to_string(),
            content_pack_substring: None,
        }
    }
}

/// Resolved identity of a consistent report/share pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyVerdict {
    pub attempt_id: String,
    pub type_code: Option<String>,
    pub content_pack_id: String,
    pub share_id: String,
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn require_ok(candidate: Candidate, documents: &Documents<'_>) -> Result<(), ConsistencyFailure> {
    let value = candidate.lookup(documents);
    if value == Some(&Value::Bool(true)) {
        return Ok(());
    }
    Err(ConsistencyFailure::new(
        CheckStep::DocumentsOk,
        FailureKind::NotOk {
            document: candidate.side.as_str().to_string(),
            actual: describe(value),
        },
    ))
}

fn require(
    chain: &FieldChain,
    step: CheckStep,
    documents: &Documents<'_>,
) -> Result<String, ConsistencyFailure> {
    chain
        .resolve(documents)
        .map(|resolved| resolved.value)
        .ok_or_else(|| ConsistencyFailure::missing(step, chain.primary()))
}

/// Run the checklist in order and stop at the first failure.
pub fn check_consistency(
    report: &Value,
    share: &Value,
    expectations: &ConsistencyExpectations,
) -> Result<ConsistencyVerdict, ConsistencyFailure> {
    let documents = Documents { report, share };

    require_ok(REPORT_OK, &documents)?;
    require_ok(SHARE_OK, &documents)?;

    let content_pack_id = require(&CONTENT_PACK_ID, CheckStep::ContentPackId, &documents)?;

    let has_cards = TRAIT_CARDS
        .lookup(&documents)
        .and_then(Value::as_array)
        .is_some_and(|cards| !cards.is_empty());
    if !has_cards {
        return Err(ConsistencyFailure::missing(
            CheckStep::TraitCards,
            TRAIT_CARDS.to_string(),
        ));
    }

    let share_id = require(&SHARE_ID, CheckStep::ShareId, &documents)?;

    let share_attempt = SHARE_ATTEMPT_ID.resolve(&documents).map(|r| r.value);
    let report_attempt = REPORT_ATTEMPT_ID.resolve(&documents).map(|r| r.value);
    let attempt_id = match (share_attempt, report_attempt) {
        (Some(share), Some(report)) if share != report => {
            return Err(ConsistencyFailure::new(
                CheckStep::AttemptId,
                FailureKind::Inconsistency {
                    field: "attempt_id".to_string(),
                    share,
                    report,
                },
            ));
        }
        (Some(share), _) => share,
        (None, Some(report)) => report,
        (None, None) => {
            return Err(ConsistencyFailure::missing(
                CheckStep::AttemptId,
                "attempt_id (share.attempt_id, report.attempt_id)",
            ));
        }
    };

    let share_type = SHARE_TYPE_CODE.resolve(&documents).map(|r| r.value);
    let report_type = REPORT_TYPE_CODE.resolve(&documents).map(|r| r.value);
    let type_code = match (share_type, report_type) {
        (Some(share), Some(report)) if share != report => {
            return Err(ConsistencyFailure::new(
                CheckStep::TypeCode,
                FailureKind::Inconsistency {
                    field: "type_code".to_string(),
                    share,
                    report,
                },
            ));
        }
        (share, report) => share.or(report),
    };

    let expected = expectations.locale.as_str();
    let underscored = expected.replace('-', "_");
    let locale = IDENTITY_LOCALE.lookup(&documents);
    let locale_ok = locale
        .and_then(Value::as_str)
        .is_some_and(|actual| actual == expected || actual == underscored);
    if !locale_ok {
        return Err(ConsistencyFailure::new(
            CheckStep::Locale,
            FailureKind::Unexpected {
                field: IDENTITY_LOCALE.to_string(),
                expected: expected.to_string(),
                actual: describe(locale),
            },
        ));
    }

    if let Some(substring) = expectations
        .content_pack_substring
        .as_deref()
        .filter(|s| !s.is_empty())
        && !content_pack_id.contains(substring)
    {
        return Err(ConsistencyFailure::new(
            CheckStep::ContentPackSubstring,
            FailureKind::Unexpected {
                field: "content_pack_id".to_string(),
                expected: format!("a value containing {substring:?}"),
                actual: content_pack_id,
            },
        ));
    }

    Ok(ConsistencyVerdict {
        attempt_id,
        type_code,
        content_pack_id,
        share_id,
    })
}

/// Either the documents could not be loaded or they disagree.
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyFailure),
}

impl AssertError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Document(_) => EXIT_UNREADABLE,
            Self::Consistency(_) => EXIT_INCONSISTENT,
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Self::Document(DocumentError::Read { .. }) => "unreadable",
            Self::Document(DocumentError::Parse { .. }) => "malformed_json",
            Self::Consistency(failure) => failure.kind.class(),
        }
    }
}

/// Load both files and run the checklist.
pub fn assert_report_files(
    report_path: impl AsRef<Path>,
    share_path: impl AsRef<Path>,
    expectations: &ConsistencyExpectations,
) -> Result<ConsistencyVerdict, AssertError> {
    let report = load_document(report_path)?;
    let share = load_document(share_path)?;
    Ok(check_consistency(&report, &share, expectations)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<CheckStep>,
    pub class: String,
    pub message: String,
}

/// Machine-readable outcome, one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertReport {
    pub check_kind: String,
    pub result: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ConsistencyVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AssertFailure>,
}

impl AssertReport {
    pub fn from_result(result: &Result<ConsistencyVerdict, AssertError>) -> Self {
        match result {
            Ok(verdict) => Self {
                check_kind: ASSERT_REPORT_KIND.to_string(),
                result: "accepted".to_string(),
                exit_code: EXIT_CONSISTENT,
                verdict: Some(verdict.clone()),
                failure: None,
            },
            Err(error) => Self {
                check_kind: ASSERT_REPORT_KIND.to_string(),
                result: "rejected".to_string(),
                exit_code: error.exit_code(),
                verdict: None,
                failure: Some(AssertFailure {
                    step: match error {
                        AssertError::Consistency(failure) => Some(failure.step),
                        AssertError::Document(_) => None,
                    },
                    class: error.class().to_string(),
                    message: error.to_string(),
                }),
            },
        }
    }

    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}
