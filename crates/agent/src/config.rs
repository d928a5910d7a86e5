//! `AgentLoopConfig` — spec.md §9 "Configuration is a struct, not keyword
//! args." Most fields are consumed by the collaborator that owns the
//! concern (journal capacity by [`aiq_journal::ExecutionJournal::new`], the
//! idle timeout by the command handler, retry caps by `aiq-llm`); this
//! struct is the single place they're declared together and threaded out
//! from [`aiq_core::config::AgentSection`] at start-up.

use std::time::Duration;

use aiq_core::config::AgentSection;
use aiq_core::CompressionThresholds;

#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    pub context_window_tokens: usize,
    pub step_limit_per_turn: usize,
    pub turn_wall_clock_s: u64,
    pub idle_timeout_s: u64,
    pub journal_capacity: usize,
    pub skill_eviction_turns: u64,
    pub compression_thresholds: CompressionThresholds,
    pub llm_retry_caps: [Duration; 3],
    pub chars_per_token: f32,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self::from_agent_section(&AgentSection::default())
    }
}

impl AgentLoopConfig {
    pub fn from_agent_section(section: &AgentSection) -> Self {
        Self {
            context_window_tokens: section.context_window_tokens,
            step_limit_per_turn: section.step_limit_per_turn,
            turn_wall_clock_s: section.turn_wall_clock_s,
            idle_timeout_s: section.idle_timeout_s,
            journal_capacity: section.journal_capacity,
            skill_eviction_turns: section.skill_eviction_turns,
            compression_thresholds: CompressionThresholds::default(),
            llm_retry_caps: [Duration::from_millis(500), Duration::from_secs(2), Duration::from_secs(8)],
            chars_per_token: 4.0,
        }
    }

    pub fn turn_wall_clock(&self) -> Duration {
        Duration::from_secs(self.turn_wall_clock_s)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let config = AgentLoopConfig::default();
        assert_eq!(config.step_limit_per_turn, 12);
        assert_eq!(config.turn_wall_clock_s, 120);
        assert_eq!(config.idle_timeout_s, 60);
        assert_eq!(config.journal_capacity, 5);
        assert_eq!(config.skill_eviction_turns, 3);
    }
}
