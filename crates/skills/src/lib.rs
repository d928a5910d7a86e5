pub mod frontmatter;
pub mod matcher;
pub mod store;

pub use frontmatter::parse_skill_md;
pub use matcher::{match_skills, CatalogEntry, MAX_MATCHES};
pub use store::SkillsStore;
