//! Recursive JSON-string unquoting (spec.md §4.3 "Argument parsing").
//!
//! The LLM sometimes double- (or triple-) encodes tool arguments: a JSON
//! string whose content is itself a JSON string. Unwrap until we hit an
//! object, capped at 10 iterations to guard against pathological input.

const MAX_UNQUOTE_ITERATIONS: usize = 10;
const TRUNCATED_BLOB_CHARS: usize = 200;

#[derive(Debug)]
pub struct ArgParseError {
    pub message: String,
}

/// Parse a raw tool-call argument blob into an object map, recursively
/// unwrapping double-encoded JSON strings.
pub fn parse_arguments(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, ArgParseError> {
    let mut blob = raw.trim().to_string();

    for _ in 0..MAX_UNQUOTE_ITERATIONS {
        if let serde_json::Value::Object(map) = try_parse(&blob) {
            return Ok(map);
        }
        match unwrap_once(&blob) {
            Some(inner) => blob = inner,
            None => break,
        }
    }

    if let serde_json::Value::Object(map) = try_parse(&blob) {
        return Ok(map);
    }

    Err(ArgParseError { message: format!("could not parse tool arguments as a JSON object: {}", truncate(raw)) })
}

fn try_parse(blob: &str) -> serde_json::Value {
    serde_json::from_str(blob).unwrap_or(serde_json::Value::Null)
}

/// If `blob` is itself a quoted JSON string, decode one layer and return
/// its inner content. Otherwise `None`.
fn unwrap_once(blob: &str) -> Option<String> {
    let trimmed = blob.trim();
    if !(trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2) {
        return None;
    }
    match serde_json::from_str::<String>(trimmed) {
        Ok(inner) => Some(inner),
        Err(_) => None,
    }
}

fn truncate(raw: &str) -> String {
    if raw.chars().count() <= TRUNCATED_BLOB_CHARS {
        return raw.to_string();
    }
    let mut truncated: String = raw.chars().take(TRUNCATED_BLOB_CHARS).collect();
    truncated.push('…');
    truncated
}
