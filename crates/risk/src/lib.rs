//! Risk Assessor — spec.md §4.2.
//!
//! Single operation, [`assess`]: given a tool name and its parsed arguments,
//! decide whether the call may run automatically (`low`) or must be
//! confirmed with the user first (`high`). Evaluation order is fixed and
//! the first match wins — see the doc comment on [`assess`].

use aiq_core::{RiskHint, RiskLevel};
use serde_json::Value;

/// Commands whose first token (after stripping leading `FOO=bar`-style
/// environment assignments) is considered read-only and safe to
/// auto-execute.
const SAFE_COMMAND_PREFIXES: &[&str] = &[
    "ls", "cat", "pwd", "echo", "grep", "find", "head", "tail", "wc", "which", "whoami", "date",
    "env", "ps",
];

const SAFE_SQL_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN"];

const SAFE_FILE_OPERATIONS: &[&str] = &["read", "list", "exists"];

const SAFE_HTTP_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS"];

/// Evaluate the risk of a tool call.
///
/// Order, first match wins:
/// 1. `args.risk_level`, if present and a recognised value — `low` maps to
///    `low`, `medium`/`high` both map to `high`.
/// 2. A per-tool whitelist rule (see the `SAFE_*` tables above).
/// 3. The conservative default, `high`.
pub fn assess(tool_name: &str, args: &Value) -> RiskLevel {
    if let Some(hint) = explicit_hint(args) {
        let level = match hint {
            RiskHint::Low => RiskLevel::Low,
            RiskHint::Medium | RiskHint::High => RiskLevel::High,
        };
        tracing::debug!(tool = tool_name, ?level, reason = "explicit_hint", "risk assessed");
        return level;
    }

    let level = match tool_name {
        "execute_sql" => assess_sql(args),
        "execute_command" => assess_command(args),
        "file_operations" => assess_file_operations(args),
        "http_request" => assess_http(args),
        _ => RiskLevel::High,
    };
    tracing::debug!(tool = tool_name, ?level, reason = "whitelist_or_default", "risk assessed");
    level
}

fn explicit_hint(args: &Value) -> Option<RiskHint> {
    let raw = args.get("risk_level")?.as_str()?;
    RiskHint::parse(raw)
}

fn assess_sql(args: &Value) -> RiskLevel {
    let Some(sql) = args.get("sql").and_then(Value::as_str) else {
        return RiskLevel::High;
    };
    match first_sql_keyword(sql) {
        Some(keyword) if SAFE_SQL_KEYWORDS.contains(&keyword.as_str()) => RiskLevel::Low,
        _ => RiskLevel::High,
    }
}

/// Strip leading `--` and `/* */` comments, then return the first keyword
/// uppercased.
fn first_sql_keyword(sql: &str) -> Option<String> {
    let mut rest = sql.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = stripped.split_once('\n').map(|(_, after)| after).unwrap_or("").trim_start();
            continue;
        }
        if let Some(stripped) = rest.strip_prefix("/*") {
            rest = stripped.split_once("*/").map(|(_, after)| after).unwrap_or("").trim_start();
            continue;
        }
        break;
    }
    rest.split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_uppercase())
        .filter(|word| !word.is_empty())
}

fn assess_command(args: &Value) -> RiskLevel {
    let Some(command) = args.get("command").and_then(Value::as_str) else {
        return RiskLevel::High;
    };
    match first_command_token(command) {
        Some(token) if SAFE_COMMAND_PREFIXES.contains(&token.as_str()) => RiskLevel::Low,
        _ => RiskLevel::High,
    }
}

/// Strip leading `FOO=bar` environment assignments, then return the first
/// remaining whitespace-delimited token.
fn first_command_token(command: &str) -> Option<String> {
    let is_assignment = |tok: &str| {
        tok.split_once('=')
            .map(|(name, _)| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
            .unwrap_or(false)
    };

    command
        .split_whitespace()
        .find(|tok| !is_assignment(tok))
        .map(ToString::to_string)
}

fn assess_file_operations(args: &Value) -> RiskLevel {
    match args.get("operation").and_then(Value::as_str) {
        Some(op) if SAFE_FILE_OPERATIONS.contains(&op) => RiskLevel::Low,
        _ => RiskLevel::High,
    }
}

fn assess_http(args: &Value) -> RiskLevel {
    match args.get("method").and_then(Value::as_str) {
        Some(method) if SAFE_HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) => {
            RiskLevel::Low
        }
        _ => RiskLevel::High,
    }
}
