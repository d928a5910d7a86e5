//! Skill matching (spec.md §4.5).
//!
//! Primary path asks an LLM (expected to be called at temperature 0 for
//! determinism — the caller is responsible for that, this module only
//! issues the call) for the top 3 relevant ids; on failure or timeout,
//! falls back to a keyword heuristic: exact name match, then substring,
//! then description token overlap.

use aiq_core::{CancelToken, LlmClient, Message};

pub const MAX_MATCHES: usize = 3;

/// `(id, name, description)` listing handed to both the LLM prompt and the
/// keyword fallback.
pub type CatalogEntry<'a> = (&'a str, &'a str, &'a str);

pub async fn match_skills(
    query: &str,
    catalog: &[CatalogEntry<'_>],
    llm: Option<&dyn LlmClient>,
    cancel: &CancelToken,
) -> Vec<String> {
    if catalog.is_empty() {
        return Vec::new();
    }

    if let Some(llm) = llm {
        match llm_match(query, catalog, llm, cancel).await {
            Ok(ids) if !ids.is_empty() => return ids,
            Ok(_) => tracing::debug!("llm skill matcher returned no ids, falling back to keyword match"),
            Err(err) => tracing::warn!(error = %err, "llm skill matcher failed, falling back to keyword match"),
        }
    }

    keyword_match(query, catalog)
}

async fn llm_match(
    query: &str,
    catalog: &[CatalogEntry<'_>],
    llm: &dyn LlmClient,
    cancel: &CancelToken,
) -> anyhow::Result<Vec<String>> {
    let listing = catalog
        .iter()
        .map(|(id, name, description)| format!("- {id}: {name} — {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Given this user request:\n\n{query}\n\nAnd this catalog of available skills:\n\n{listing}\n\n\
         Return a JSON array of up to {MAX_MATCHES} skill ids (the part before the colon) most relevant \
         to the request, most relevant first. Return ONLY the JSON array, e.g. [\"order-lookup\"]."
    );

    let messages = [Message::user(prompt)];
    let reply = llm.chat(&messages, &[], cancel).await?;
    let content = reply.content.unwrap_or_default();
    let ids = parse_id_array(&content, catalog);
    Ok(ids.into_iter().take(MAX_MATCHES).collect())
}

fn parse_id_array(content: &str, catalog: &[CatalogEntry<'_>]) -> Vec<String> {
    let known: Vec<&str> = catalog.iter().map(|(id, _, _)| *id).collect();
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(content.trim()) else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| item.as_str().map(ToString::to_string))
        .filter(|id| known.contains(&id.as_str()))
        .collect()
}

fn keyword_match(query: &str, catalog: &[CatalogEntry<'_>]) -> Vec<String> {
    let query_lower = query.to_ascii_lowercase();
    let query_tokens: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();

    let mut scored: Vec<(i64, String)> = catalog
        .iter()
        .map(|(id, name, description)| {
            let name_lower = name.to_ascii_lowercase();
            let score = if name_lower == query_lower {
                3
            } else if query_lower.contains(&name_lower) || name_lower.contains(&query_lower) {
                2
            } else {
                let desc_lower = description.to_ascii_lowercase();
                let overlap = desc_lower.split_whitespace().filter(|tok| query_tokens.contains(tok)).count();
                overlap as i64
            };
            (score, id.to_string())
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(MAX_MATCHES).map(|(_, id)| id).collect()
}
