//! Ordered field resolution.
//!
//! A logical field (say, the content-pack id) may live at several places in
//! the two documents. A [`FieldChain`] lists those places in priority order
//! and resolves to the first one holding a non-empty scalar.

use serde_json::Value;
use std::fmt;

/// Which input document a path is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Report,
    Share,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Share => "share",
        }
    }
}

/// Object keys from a document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub side: Side,
    pub path: &'static [&'static str],
}

impl Candidate {
    pub const fn report(path: &'static [&'static str]) -> Self {
        Self {
            side: Side::Report,
            path,
        }
    }

    pub const fn share(path: &'static [&'static str]) -> Self {
        Self {
            side: Side::Share,
            path,
        }
    }

    /// Walk the path; `None` as soon as a key is absent or a non-object is
    /// in the way.
    pub fn lookup<'a>(&self, documents: &Documents<'a>) -> Option<&'a Value> {
        let root = match self.side {
            Side::Report => documents.report,
            Side::Share => documents.share,
        };
        self.path
            .iter()
            .try_fold(root, |value, key| value.as_object()?.get(*key))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.side.as_str(), self.path.join("."))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Documents<'a> {
    pub report: &'a Value,
    pub share: &'a Value,
}

/// A value found by a chain, with the place it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldChain {
    pub field: &'static str,
    pub candidates: &'static [Candidate],
}

impl FieldChain {
    pub fn resolve(&self, documents: &Documents<'_>) -> Option<Resolved> {
        self.candidates.iter().find_map(|candidate| {
            let value = scalar_text(candidate.lookup(documents)?)?;
            Some(Resolved {
                value,
                source: candidate.to_string(),
            })
        })
    }

    /// The highest-priority place, used to name the field in diagnostics.
    pub fn primary(&self) -> String {
        self.candidates
            .first()
            .map(Candidate::to_string)
            .unwrap_or_else(|| self.field.to_string())
    }
}

/// Non-empty scalar text: a string of length > 0, or a number in its JSON
/// form. Null, booleans, empty strings, arrays and objects resolve nothing.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub const CONTENT_PACK_ID: FieldChain = FieldChain {
    field: "content_pack_id",
    candidates: &[
        Candidate::report(&["report", "versions", "content_pack_id"]),
        Candidate::report(&["report", "versions", "content_pack"]),
        Candidate::report(&["report", "content_pack_id"]),
        Candidate::report(&["content_pack_id"]),
    ],
};

pub const SHARE_ID: FieldChain = FieldChain {
    field: "share_id",
    candidates: &[Candidate::share(&["share_id"])],
};

pub const SHARE_ATTEMPT_ID: FieldChain = FieldChain {
    field: "attempt_id",
    candidates: &[Candidate::share(&["attempt_id"])],
};

pub const REPORT_ATTEMPT_ID: FieldChain = FieldChain {
    field: "attempt_id",
    candidates: &[Candidate::report(&["attempt_id"])],
};

pub const SHARE_TYPE_CODE: FieldChain = FieldChain {
    field: "type_code",
    candidates: &[Candidate::share(&["type_code"])],
};

pub const REPORT_TYPE_CODE: FieldChain = FieldChain {
    field: "type_code",
    candidates: &[
        Candidate::report(&["report", "profile", "type_code"]),
        Candidate::report(&["type_code"]),
    ],
};

pub const TRAIT_CARDS: Candidate = Candidate::report(&["report", "sections", "traits", "cards"]);
pub const IDENTITY_LOCALE: Candidate = Candidate::report(&["report", "identity_card", "locale"]);
pub const REPORT_OK: Candidate = Candidate::report(&["ok"]);
pub const SHARE_OK: Candidate = Candidate::share(&["ok"]);
