//! `AppConfig` — opaque to the core per spec.md §6 except for the one field
//! (`agent.context_window_tokens`) the Prompt Assembler needs to size its
//! budget. Loaded from `<CONFIG>/config.yaml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AiqError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub name: String,
    pub context_window_tokens: usize,
    pub step_limit_per_turn: usize,
    pub turn_wall_clock_s: u64,
    pub idle_timeout_s: u64,
    pub journal_capacity: usize,
    pub skill_eviction_turns: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "aiq".to_string(),
            context_window_tokens: 32_000,
            step_limit_per_turn: 12,
            turn_wall_clock_s: 120,
            idle_timeout_s: 60,
            journal_capacity: 5,
            skill_eviction_turns: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama3.1:8b".to_string(),
        }
    }
}

/// Mirrors `SafetyConfig` in the grounding repo's `aigent-config` crate,
/// narrowed to the knobs the risk assessor and executor actually consult.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySection {
    pub sandbox_root: String,
    pub allow_shell: bool,
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            sandbox_root: ".".to_string(),
            allow_shell: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelemetrySection {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub safety: SafetySection,
    pub telemetry: TelemetrySection,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AiqError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_yaml::from_str(&raw)
                .map_err(|source| AiqError::ConfigCorrupt { source })?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(AiqError::Io { source }),
        }
    }

    /// Write the config atomically (temp file + fsync + rename) so a crash
    /// mid-write never corrupts the previous config.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), AiqError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AiqError::Io { source })?;
        }
        let rendered =
            serde_yaml::to_string(self).map_err(|source| AiqError::ConfigCorrupt { source })?;

        let tmp_path = path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, rendered).map_err(|source| AiqError::Io { source })?;
        std::fs::rename(&tmp_path, path).map_err(|source| AiqError::Io { source })?;
        Ok(())
    }
}
