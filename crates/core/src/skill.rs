//! Skill card data shape. Filesystem scanning and matching live in
//! `aiq-skills`.

use serde::{Deserialize, Serialize};

/// Front-matter metadata for a skill card (`<CONFIG>/skills/<id>/SKILL.md`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub name: String,
    /// Capped at 200 chars by the store on load (spec.md §3).
    pub description: String,
}

/// A skill known to the store. `body` is only populated once the skill has
/// been matched into the active set for a turn (spec.md §4.5 "lazily loaded").
#[derive(Debug, Clone)]
pub struct Skill {
    pub id: String,
    pub metadata: SkillMetadata,
    pub body: Option<String>,
    pub last_matched_round: Option<u64>,
    pub active: bool,
}

impl Skill {
    pub fn new(id: impl Into<String>, metadata: SkillMetadata) -> Self {
        Self {
            id: id.into(),
            metadata,
            body: None,
            last_matched_round: None,
            active: false,
        }
    }
}
