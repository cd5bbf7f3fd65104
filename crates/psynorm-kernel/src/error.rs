//! Error taxonomy for norms builds.
//!
//! Every variant is fatal: the pipeline never produces a partial group or a
//! partially merged table.

/// Errors raised while reading, computing, or persisting norms.
#[derive(Debug, thiserror::Error)]
pub enum NormsError {
    /// Unreadable or unparseable input, or a file with the wrong schema.
    #[error("malformed input {source_label}: {cause}")]
    MalformedInput { source_label: String, cause: String },

    /// A required column or field is absent.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The fallback group is not a complete, previously valid group.
    #[error(
        "fallback group {group_id} does not have full {expected} metrics; got {found}",
        expected = crate::taxonomy::METRIC_COUNT
    )]
    IncompleteFallbackGroup { group_id: String, found: usize },

    /// Accepted attempts exist but a metric has no observations.
    #[error("no values for metric={metric_code}")]
    MissingMetricData { metric_code: String },

    /// Writing a table or artifact failed.
    #[error("storage error: {path}: {message}")]
    Storage { path: String, message: String },

    /// A build profile or option is invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl NormsError {
    pub fn malformed(source_label: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_label: source_label.into(),
            cause: cause.into(),
        }
    }

    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable snake_case class used in JSON diagnostics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::IncompleteFallbackGroup { .. } => "incomplete_fallback_group",
            Self::MissingMetricData { .. } => "missing_metric_data",
            Self::Storage { .. } => "storage",
            Self::Config { .. } => "config",
        }
    }
}
