//! Deterministic digests.
//!
//! Two builds given the same inputs MUST report identical digests, so JSON
//! material is serialized canonically (sorted keys, no whitespace) before
//! hashing.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 of raw bytes, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of the canonical JSON encoding of `value`.
pub fn stable_sha256(value: &Value) -> String {
    sha256_hex(&canonical_json_bytes(value))
}

/// Canonical JSON: object keys sorted lexicographically, no insignificant
/// whitespace.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => b"null".to_vec(),
        Value::Bool(true) => b"true".to_vec(),
        Value::Bool(false) => b"false".to_vec(),
        Value::Number(n) => n.to_string().into_bytes(),
        Value::String(s) => encode_string(s),
        Value::Array(items) => {
            let mut out = vec![b'['];
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                out.extend(canonical_json_bytes(item));
            }
            out.push(b']');
            out
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = vec![b'{'];
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                out.extend(encode_string(key));
                out.push(b':');
                out.extend(canonical_json_bytes(item));
            }
            out.push(b'}');
            out
        }
    }
}

fn encode_string(s: &str) -> Vec<u8> {
    // Serializing a &str cannot fail.
    serde_json::to_vec(s).unwrap_or_default()
}
