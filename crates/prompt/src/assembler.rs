//! Prompt Assembler (spec.md §4.6) — ties the system message, active
//! skills, tool execution summary, and conversation transcript into the
//! final `Vec<Message>` sent to the LLM, applying tiered compression as the
//! estimated fill ratio against the context window climbs.

use aiq_core::budget::estimate_tokens;
use aiq_core::{CancelToken, CompressionLevel, Message, PromptBudget, Skill, ToolDefinition};

use crate::compression::{compress_transcript, keep_latest_that_fit, CompressionCache, Compressor};
use crate::system::build_system_message;

/// Raw transcript messages older than this are eligible for compression;
/// the most recent ones are always kept verbatim so the model never loses
/// the immediate thread of the conversation.
const LIVE_TAIL_MESSAGES: usize = 4;

pub struct AssembledPrompt {
    pub messages: Vec<Message>,
    pub compression_level: CompressionLevel,
}

pub struct PromptAssembler {
    pub agent_name: String,
    pub chars_per_token: f32,
}

impl PromptAssembler {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self { agent_name: agent_name.into(), chars_per_token: 4.0 }
    }

    /// Build the prompt for one LLM round. `current_turn` is the agent
    /// loop's round counter, used to tell which active skills were matched
    /// this turn versus merely carried over from an earlier one.
    ///
    /// `budget.used_estimate` is recomputed from the assembled text before
    /// returning, so the caller can inspect `budget.active_compression_level`
    /// afterward.
    pub async fn assemble(
        &self,
        budget: &mut PromptBudget,
        tool_definitions: &[ToolDefinition],
        active_skills: &[&Skill],
        transcript: &[Message],
        journal_summary: &str,
        compressor: &dyn Compressor,
        cache: &CompressionCache,
        cancel: &CancelToken,
        current_turn: u64,
    ) -> AssembledPrompt {
        let provisional_system_text = build_system_message(&self.agent_name, tool_definitions, active_skills);
        let provisional_estimate = estimate_tokens(&provisional_system_text, self.chars_per_token)
            + estimate_tokens(&crate::compression::render_transcript(transcript), self.chars_per_token);
        budget.used_estimate = provisional_estimate;
        let level = budget.recompute_level();

        let resolved_skills = resolve_skills(active_skills, level, current_turn);
        let resolved_skill_refs: Vec<&Skill> = resolved_skills.iter().collect();

        let mut system_text = build_system_message(&self.agent_name, tool_definitions, &resolved_skill_refs);
        if !journal_summary.is_empty() {
            system_text.push_str(&format!("\n\n<TOOL_EXECUTION_SUMMARY>\n{journal_summary}\n</TOOL_EXECUTION_SUMMARY>"));
        }

        let transcript_messages = match level {
            CompressionLevel::None => transcript.to_vec(),
            CompressionLevel::Light | CompressionLevel::Aggressive | CompressionLevel::Max => {
                let split_at = transcript.len().saturating_sub(LIVE_TAIL_MESSAGES);
                let (older, tail) = transcript.split_at(split_at);
                let summary_message = compress_transcript(compressor, cache, older, level.target_reduction(), cancel).await;

                let mut combined = vec![summary_message];
                if level == CompressionLevel::Max {
                    let tail_budget = (tail.iter().map(|m| m.content.as_deref().map(str::len).unwrap_or(0)).sum::<usize>() as f32
                        * level.target_reduction()) as usize;
                    combined.extend(keep_latest_that_fit(tail, tail_budget.max(1)));
                } else {
                    combined.extend_from_slice(tail);
                }
                combined
            }
        };

        let mut messages = Vec::with_capacity(transcript_messages.len() + 1);
        messages.push(Message::system(system_text));
        messages.extend(transcript_messages);

        let final_text = crate::compression::render_transcript(&messages);
        budget.used_estimate = estimate_tokens(&final_text, self.chars_per_token);
        budget.recompute_level();

        AssembledPrompt { messages, compression_level: level }
    }
}

/// Narrow the active skill set per spec.md §4.6's compression tiers: at
/// Aggressive and above, drop skills not matched this turn (they're
/// carried over from an earlier round and lowest priority); at Max, also
/// shrink the bodies of whatever survives.
fn resolve_skills(active_skills: &[&Skill], level: CompressionLevel, current_turn: u64) -> Vec<Skill> {
    match level {
        CompressionLevel::None | CompressionLevel::Light => {
            active_skills.iter().map(|skill| (*skill).clone()).collect()
        }
        CompressionLevel::Aggressive => active_skills
            .iter()
            .filter(|skill| skill.last_matched_round == Some(current_turn))
            .map(|skill| (*skill).clone())
            .collect(),
        CompressionLevel::Max => active_skills
            .iter()
            .filter(|skill| skill.last_matched_round == Some(current_turn))
            .map(|skill| {
                let mut skill = (*skill).clone();
                skill.body = skill.body.as_deref().map(|body| {
                    let target = ((body.chars().count() as f32) * level.target_reduction()).ceil() as usize;
                    crate::compression::truncate_chars(body, target.max(1))
                });
                skill
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::LlmCompressor;
    use aiq_core::{ChatReply, SkillMetadata};
    use async_trait::async_trait;

    struct FakeLlm {
        reply: String,
    }

    #[async_trait]
    impl aiq_core::LlmClient for FakeLlm {
        async fn chat(&self, _messages: &[Message], _tools: &[ToolDefinition], _cancel: &CancelToken) -> anyhow::Result<ChatReply> {
            Ok(ChatReply { content: Some(self.reply.clone()), tool_calls: vec![], finish_reason: "stop".into() })
        }
    }

    fn long_transcript(n: usize) -> Vec<Message> {
        (0..n).map(|i| Message::user(format!("message number {i} with some padding text"))).collect()
    }

    #[tokio::test]
    async fn below_threshold_keeps_transcript_verbatim() {
        let assembler = PromptAssembler::new("aiq");
        let mut budget = PromptBudget::new(1_000_000);
        let llm = FakeLlm { reply: "summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();
        let transcript = long_transcript(3);

        let assembled = assembler
            .assemble(&mut budget, &[], &[], &transcript, "", &compressor, &cache, &CancelToken::new(), 1)
            .await;

        assert_eq!(assembled.compression_level, CompressionLevel::None);
        // system message + all 3 original messages, untouched.
        assert_eq!(assembled.messages.len(), 4);
    }

    #[tokio::test]
    async fn above_threshold_compresses_older_messages() {
        let assembler = PromptAssembler::new("aiq");
        let mut budget = PromptBudget::new(100);
        let llm = FakeLlm { reply: "compact summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();
        let transcript = long_transcript(20);

        let assembled = assembler
            .assemble(&mut budget, &[], &[], &transcript, "", &compressor, &cache, &CancelToken::new(), 1)
            .await;

        assert_ne!(assembled.compression_level, CompressionLevel::None);
        let summary_present = assembled.messages.iter().any(|m| m.content.as_deref().unwrap_or_default().contains("compact summary"));
        assert!(summary_present);
    }

    #[tokio::test]
    async fn tool_execution_summary_is_embedded_in_system_message() {
        let assembler = PromptAssembler::new("aiq");
        let mut budget = PromptBudget::new(1_000_000);
        let llm = FakeLlm { reply: "summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();

        let assembled = assembler
            .assemble(&mut budget, &[], &[], &[], "- execute_sql ok", &compressor, &cache, &CancelToken::new(), 1)
            .await;

        let system = assembled.messages[0].content.as_deref().unwrap_or_default();
        assert!(system.contains("<TOOL_EXECUTION_SUMMARY>"));
        assert!(system.contains("execute_sql ok"));
    }

    #[tokio::test]
    async fn live_tail_is_preserved_uncompressed_below_max_tier() {
        let assembler = PromptAssembler::new("aiq");
        let mut budget = PromptBudget::new(120);
        let llm = FakeLlm { reply: "summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();
        let transcript = long_transcript(10);

        let assembled = assembler
            .assemble(&mut budget, &[], &[], &transcript, "", &compressor, &cache, &CancelToken::new(), 1)
            .await;

        let last_original = transcript.last().unwrap().content.as_deref().unwrap();
        let tail_present = assembled.messages.iter().any(|m| m.content.as_deref() == Some(last_original));
        if assembled.compression_level != CompressionLevel::Max {
            assert!(tail_present);
        }
    }

    fn skill(id: &str, name: &str, body: &str, last_matched_round: Option<u64>) -> Skill {
        Skill {
            id: id.into(),
            metadata: SkillMetadata { name: name.into(), description: "d".into() },
            body: Some(body.into()),
            last_matched_round,
            active: true,
        }
    }

    #[tokio::test]
    async fn aggressive_tier_evicts_skills_not_matched_this_turn() {
        let assembler = PromptAssembler::new("aiq");
        let llm = FakeLlm { reply: "summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();

        let stale = skill("stale", "Stale", "stale skill body", Some(1));
        let fresh = skill("fresh", "Fresh", "fresh skill body", Some(5));
        let active_skills = [&stale, &fresh];

        // Size the window so the provisional estimate (built from the
        // un-narrowed skill set, as `assemble` itself does) lands in the
        // Aggressive band without spilling into Max.
        let provisional = build_system_message("aiq", &[], &active_skills);
        let estimate = estimate_tokens(&provisional, 4.0);
        let mut budget = PromptBudget::new((estimate as f32 / 0.92) as usize);

        let assembled = assembler
            .assemble(&mut budget, &[], &active_skills, &[], "", &compressor, &cache, &CancelToken::new(), 5)
            .await;

        assert_eq!(assembled.compression_level, CompressionLevel::Aggressive);
        let system = assembled.messages[0].content.as_deref().unwrap_or_default();
        assert!(system.contains("<SKILL name=\"Fresh\">"));
        assert!(!system.contains("<SKILL name=\"Stale\">"));
    }

    #[tokio::test]
    async fn max_tier_compresses_skill_bodies() {
        let assembler = PromptAssembler::new("aiq");
        let llm = FakeLlm { reply: "summary".into() };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();

        let body = "x".repeat(200);
        let orders = skill("orders", "Orders", &body, Some(3));
        let active_skills = [&orders];

        let provisional = build_system_message("aiq", &[], &active_skills);
        let estimate = estimate_tokens(&provisional, 4.0);
        let mut budget = PromptBudget::new((estimate as f32 / 0.97) as usize);

        let assembled = assembler
            .assemble(&mut budget, &[], &active_skills, &[], "", &compressor, &cache, &CancelToken::new(), 3)
            .await;

        assert_eq!(assembled.compression_level, CompressionLevel::Max);
        let system = assembled.messages[0].content.as_deref().unwrap_or_default();
        assert!(system.contains("<SKILL name=\"Orders\">"));
        assert!(system.matches('x').count() < 200);
    }
}
