//! Loading the two input documents.

use serde_json::Value;
use std::path::Path;

/// Input that could not be read or is not JSON. Distinct from a consistency
/// failure: the documents were never compared.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DocumentError {
    pub fn path(&self) -> &str {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

pub fn parse_document(text: &str, label: &str) -> Result<Value, DocumentError> {
    serde_json::from_str(text).map_err(|source| DocumentError::Parse {
        path: label.to_string(),
        source,
    })
}

pub fn load_document(path: impl AsRef<Path>) -> Result<Value, DocumentError> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: label.clone(),
        source,
    })?;
    parse_document(&text, &label)
}
