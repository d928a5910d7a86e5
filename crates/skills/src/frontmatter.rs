//! `SKILL.md` front-matter parsing (spec.md §4.5).
//!
//! Hand-rolled scanner for the two scalar fields we need — no full YAML
//! parser, so a malformed user skill file can never take down the store.

/// Parse a `SKILL.md` file's contents into `(name, description, body)`.
/// Returns `None` on any structural problem (missing `---` fence, missing
/// `name:`) rather than erroring — callers log and skip.
pub fn parse_skill_md(content: &str) -> Option<(String, String, String)> {
    let trimmed = content.trim();
    if !trimmed.starts_with("---") {
        return None;
    }

    let after_first = &trimmed[3..];
    let end_idx = after_first.find("\n---")?;
    let frontmatter = &after_first[..end_idx];
    let body = after_first[end_idx + 4..].trim();

    let mut name = String::new();
    let mut description = String::new();

    for line in frontmatter.lines() {
        let line = line.trim();
        if let Some(val) = line.strip_prefix("name:") {
            name = unquote(val);
        } else if let Some(val) = line.strip_prefix("description:") {
            description = unquote(val);
        }
    }

    if name.is_empty() {
        return None;
    }

    Some((name, description, body.to_string()))
}

fn unquote(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_string()
}
