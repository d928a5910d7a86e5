//! State-change detection (spec.md §4.4).

use aiq_core::StateChange;

/// Inspect a successful tool call's name/arguments and decide whether it
/// changed resource state worth surfacing back to the LLM.
pub fn detect(tool_name: &str, args: &serde_json::Value) -> Option<StateChange> {
    match tool_name {
        "execute_sql" => detect_sql(args.get("sql")?.as_str()?),
        "file_operations" => detect_file_write(args),
        "http_request" => detect_http_write(args),
        _ => None,
    }
}

fn detect_sql(sql: &str) -> Option<StateChange> {
    let trimmed = sql.trim();
    let mut words = trimmed.split_whitespace();
    let keyword = words.next()?.to_ascii_uppercase();

    let resource = sql_target_resource(trimmed)?;
    match keyword.as_str() {
        "CREATE" => Some(StateChange::ResourceCreated { resource }),
        "DROP" => Some(StateChange::ResourceDeleted { resource }),
        "ALTER" => Some(StateChange::ResourceModified { resource }),
        _ => None,
    }
}

/// `CREATE TABLE foo`, `DROP TABLE foo`, `ALTER TABLE foo ...` — lift the
/// identifier following the object-type keyword (`TABLE`, `INDEX`, `VIEW`,
/// …), skipping an optional `IF [NOT] EXISTS`.
fn sql_target_resource(sql: &str) -> Option<String> {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let object_keywords = ["TABLE", "INDEX", "VIEW", "DATABASE", "SCHEMA"];

    let mut idx = tokens.iter().position(|t| object_keywords.contains(&t.to_ascii_uppercase().as_str()))? + 1;
    while idx < tokens.len() {
        let upper = tokens[idx].to_ascii_uppercase();
        if upper == "IF" || upper == "NOT" || upper == "EXISTS" {
            idx += 1;
            continue;
        }
        break;
    }

    tokens.get(idx).map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '.').to_string()).filter(|s| !s.is_empty())
}

fn detect_file_write(args: &serde_json::Value) -> Option<StateChange> {
    let operation = args.get("operation")?.as_str()?;
    if operation != "write" {
        return None;
    }
    let path = args.get("path")?.as_str()?.to_string();
    Some(StateChange::ResourceModified { resource: path })
}

fn detect_http_write(args: &serde_json::Value) -> Option<StateChange> {
    let method = args.get("method")?.as_str()?.to_ascii_uppercase();
    if matches!(method.as_str(), "GET" | "HEAD" | "OPTIONS") {
        return None;
    }
    let url = args.get("url")?.as_str()?.to_string();
    Some(StateChange::ResourceModified { resource: url })
}
