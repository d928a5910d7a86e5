//! Error Extraction (spec.md §4.3) — database-agnostic regex patterns that
//! classify a raw failure message into a structured [`ToolResult::Error`].

use aiq_core::ErrorType;
use regex::Regex;
use std::sync::OnceLock;

pub struct ExtractedError {
    pub error_type: ErrorType,
    pub affected_resources: Vec<String>,
    pub dependencies: Vec<String>,
}

fn foreign_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)referenced by .*?on table '?([a-zA-Z0-9_\.]+)'?|foreign key constraint"#).unwrap()
    })
}

fn syntax_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)syntax error|you have an error in your sql syntax|parse error").unwrap())
}

fn permission_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)permission denied|access denied|not authorized|forbidden").unwrap())
}

fn connection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)connection refused|could not connect|connection reset|broken pipe").unwrap())
}

fn timeout_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)timed? ?out|deadline exceeded").unwrap())
}

fn not_found_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)(?:table|file|relation|column) '?([a-zA-Z0-9_\.\/]+)'? (?:doesn't exist|does not exist|not found)"#).unwrap())
}

fn exists_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)'?([a-zA-Z0-9_\.\/]+)'? already exists|duplicate (?:key|entry)"#).unwrap())
}

/// Classify `message` and lift any resource names the pattern captured.
pub fn extract(message: &str) -> ExtractedError {
    if let Some(captures) = foreign_key_re().captures(message) {
        let dependencies = captures.get(1).map(|m| vec![m.as_str().to_string()]).unwrap_or_default();
        return ExtractedError { error_type: ErrorType::ForeignKeyConstraint, affected_resources: Vec::new(), dependencies };
    }
    if syntax_re().is_match(message) {
        return ExtractedError { error_type: ErrorType::SyntaxError, affected_resources: Vec::new(), dependencies: Vec::new() };
    }
    if permission_re().is_match(message) {
        return ExtractedError { error_type: ErrorType::PermissionDenied, affected_resources: Vec::new(), dependencies: Vec::new() };
    }
    if connection_re().is_match(message) {
        return ExtractedError { error_type: ErrorType::ConnectionError, affected_resources: Vec::new(), dependencies: Vec::new() };
    }
    if timeout_re().is_match(message) {
        return ExtractedError { error_type: ErrorType::Timeout, affected_resources: Vec::new(), dependencies: Vec::new() };
    }
    if let Some(captures) = not_found_re().captures(message) {
        let affected_resources = captures.get(1).map(|m| vec![m.as_str().to_string()]).unwrap_or_default();
        return ExtractedError { error_type: ErrorType::ResourceNotFound, affected_resources, dependencies: Vec::new() };
    }
    if let Some(captures) = exists_re().captures(message) {
        let affected_resources = captures.get(1).map(|m| vec![m.as_str().to_string()]).unwrap_or_default();
        return ExtractedError { error_type: ErrorType::ResourceExists, affected_resources, dependencies: Vec::new() };
    }
    ExtractedError { error_type: ErrorType::Unknown, affected_resources: Vec::new(), dependencies: Vec::new() }
}
