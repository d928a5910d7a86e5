//! Skills Store (spec.md §4.5) — filesystem scan, metadata cache, lazy body
//! loading, and last-matched-round eviction tracking.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use aiq_core::{Skill, SkillMetadata};

use crate::frontmatter::parse_skill_md;

struct CatalogEntry {
    metadata: SkillMetadata,
    path: PathBuf,
}

pub struct SkillsStore {
    catalog: HashMap<String, CatalogEntry>,
    active: HashMap<String, Skill>,
}

impl SkillsStore {
    /// Scan `root` for `<id>/SKILL.md` cards. Parse failures are logged and
    /// skipped — never fatal (spec.md §4.5, §7).
    pub fn scan(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut catalog = HashMap::new();

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skills root unreadable, starting with an empty store");
                return Self { catalog, active: HashMap::new() };
            }
        };

        for entry in entries.flatten() {
            let dir_path = entry.path();
            if !dir_path.is_dir() {
                continue;
            }
            let Some(id) = dir_path.file_name().and_then(|n| n.to_str()).map(ToString::to_string) else {
                continue;
            };
            let skill_md = dir_path.join("SKILL.md");
            let raw = match std::fs::read_to_string(&skill_md) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skill card unreadable, skipping");
                    continue;
                }
            };
            match parse_skill_md(&raw) {
                Some((name, description, _body)) => {
                    let description = truncate_chars(&description, 200);
                    catalog.insert(id, CatalogEntry { metadata: SkillMetadata { name, description }, path: skill_md });
                }
                None => {
                    tracing::warn!(id = %id, "skill card front-matter malformed, skipping");
                }
            }
        }

        Self { catalog, active: HashMap::new() }
    }

    pub fn metadata_listing(&self) -> Vec<(String, SkillMetadata)> {
        self.catalog.iter().map(|(id, entry)| (id.clone(), entry.metadata.clone())).collect()
    }

    /// Mark `id` active for `round`, lazily loading its body on first
    /// activation. Returns `None` if `id` is not in the catalog.
    pub fn activate(&mut self, id: &str, round: u64) -> Option<&Skill> {
        if !self.active.contains_key(id) {
            let entry = self.catalog.get(id)?;
            let body = load_body(&entry.path);
            self.active.insert(
                id.to_string(),
                Skill {
                    id: id.to_string(),
                    metadata: entry.metadata.clone(),
                    body,
                    last_matched_round: Some(round),
                    active: true,
                },
            );
        } else if let Some(skill) = self.active.get_mut(id) {
            skill.last_matched_round = Some(round);
        }
        self.active.get(id)
    }

    /// Drop any active skill whose `last_matched_round` is more than
    /// `eviction_turns` behind `current_round`, unless it's in `protected`
    /// (spec.md §4.5: "Skills currently referenced in the conversation
    /// context are protected from eviction within the same turn").
    pub fn evict_stale(&mut self, current_round: u64, eviction_turns: u64, protected: &HashSet<String>) {
        self.active.retain(|id, skill| {
            if protected.contains(id) {
                return true;
            }
            match skill.last_matched_round {
                Some(last) => current_round.saturating_sub(last) <= eviction_turns,
                None => false,
            }
        });
    }

    pub fn active_skills(&self) -> Vec<&Skill> {
        self.active.values().collect()
    }
}

fn load_body(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    parse_skill_md(&raw).map(|(_, _, body)| body)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_card(dir: &Path, id: &str, name: &str, description: &str, body: &str) {
        let skill_dir = dir.join(id);
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n{body}\n"),
        )
        .unwrap();
    }

    #[test]
    fn scan_populates_metadata_without_loading_body() {
        let dir = tempfile::tempdir().unwrap();
        write_card(dir.path(), "orders", "Order Lookup", "Find orders", "full instructions here");

        let store = SkillsStore::scan(dir.path());
        let listing = store.metadata_listing();
        assert_eq!(listing.len(), 1);
        assert!(store.active_skills().is_empty());
    }

    #[test]
    fn activate_lazily_loads_body() {
        let dir = tempfile::tempdir().unwrap();
        write_card(dir.path(), "orders", "Order Lookup", "Find orders", "use execute_sql here");

        let mut store = SkillsStore::scan(dir.path());
        let skill = store.activate("orders", 1).unwrap();
        assert!(skill.body.as_deref().unwrap_or_default().contains("execute_sql"));
        assert_eq!(skill.last_matched_round, Some(1));
    }

    #[test]
    fn malformed_card_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("broken");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "not a valid card").unwrap();

        let store = SkillsStore::scan(dir.path());
        assert!(store.metadata_listing().is_empty());
    }

    #[test]
    fn eviction_drops_stale_unprotected_skills() {
        let dir = tempfile::tempdir().unwrap();
        write_card(dir.path(), "orders", "Order Lookup", "Find orders", "body");
        write_card(dir.path(), "refunds", "Refunds", "Process refunds", "body");

        let mut store = SkillsStore::scan(dir.path());
        store.activate("orders", 1);
        store.activate("refunds", 1);

        store.evict_stale(5, 3, &HashSet::new());
        assert!(store.active_skills().is_empty());
    }

    #[test]
    fn protected_skill_survives_eviction() {
        let dir = tempfile::tempdir().unwrap();
        write_card(dir.path(), "orders", "Order Lookup", "Find orders", "body");

        let mut store = SkillsStore::scan(dir.path());
        store.activate("orders", 1);

        let mut protected = HashSet::new();
        protected.insert("orders".to_string());
        store.evict_stale(10, 3, &protected);
        assert_eq!(store.active_skills().len(), 1);
    }

    #[test]
    fn recent_match_survives_eviction_window() {
        let dir = tempfile::tempdir().unwrap();
        write_card(dir.path(), "orders", "Order Lookup", "Find orders", "body");

        let mut store = SkillsStore::scan(dir.path());
        store.activate("orders", 4);
        store.evict_stale(5, 3, &HashSet::new());
        assert_eq!(store.active_skills().len(), 1);
    }
}
