//! Argument canonicalization and digesting (spec.md §4.4).

use sha2::{Digest, Sha256};

/// Recursively sort object keys so semantically identical argument maps
/// hash identically regardless of the order the LLM emitted them in.
fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, serde_json::Value> = std::collections::BTreeMap::new();
            for (key, val) in map {
                sorted.insert(key.clone(), canonicalize(val));
            }
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Hex-encoded SHA-256 of the canonicalized arguments.
pub fn digest_arguments(args: &serde_json::Value) -> String {
    let canonical = canonicalize(args);
    let rendered = canonical.to_string();
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    format!("{:x}", hasher.finalize())
}
