//! Transcript compression (spec.md §4.6) — an LLM-backed summarization call
//! for the portion of the transcript being dropped from the live prompt,
//! cached by content digest, with a character-truncation fallback when the
//! summarization call itself fails.

use std::collections::HashMap;
use std::sync::Mutex;

use aiq_core::{CancelToken, LlmClient, Message};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

const MAX_COMPRESSION_ATTEMPTS: usize = 2;

fn cache_key(content: &str, target_reduction: f32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(target_reduction.to_bits().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Memoizes compressed output by `(content, target_reduction)` digest so the
/// same transcript prefix isn't re-summarized every round it stays in the
/// dropped portion of the window.
#[derive(Default)]
pub struct CompressionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl CompressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, content: &str, target_reduction: f32) -> Option<String> {
        self.entries.lock().unwrap().get(&cache_key(content, target_reduction)).cloned()
    }

    pub fn put(&self, content: &str, target_reduction: f32, compressed: String) {
        self.entries.lock().unwrap().insert(cache_key(content, target_reduction), compressed);
    }
}

#[async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `text` down to roughly `target_reduction` of its original
    /// length (e.g. `0.5` asks for about half).
    async fn compress(&self, text: &str, target_reduction: f32, cancel: &CancelToken) -> anyhow::Result<String>;
}

/// Default [`Compressor`] — a dedicated LLM call per spec.md §4.6, separate
/// from the main agent-loop conversation.
pub struct LlmCompressor<'a> {
    pub llm: &'a dyn LlmClient,
}

#[async_trait]
impl<'a> Compressor for LlmCompressor<'a> {
    async fn compress(&self, text: &str, target_reduction: f32, cancel: &CancelToken) -> anyhow::Result<String> {
        let retain_pct = (target_reduction.clamp(0.0, 1.0) * 100.0).round() as i32;
        let instruction = format!(
            "Summarize the conversation excerpt below, preserving every concrete \
             fact, identifier, and decision a later turn might need, in roughly \
             {retain_pct}% of its original length. Reply with only the summary.\n\n{text}"
        );
        let request = [Message::user(instruction)];

        let mut last_err = None;
        for attempt in 0..MAX_COMPRESSION_ATTEMPTS {
            if cancel.is_cancelled() {
                anyhow::bail!("compression cancelled");
            }
            match self.llm.chat(&request, &[], cancel).await {
                Ok(reply) => match reply.content {
                    Some(content) if !content.trim().is_empty() => return Ok(content),
                    _ => last_err = Some(anyhow::anyhow!("compression attempt {attempt} returned empty content")),
                },
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("compression failed with no attempts made")))
    }
}

/// Flatten a transcript slice into plain `role: content` lines for the
/// compression prompt.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            let content = message.content.as_deref().unwrap_or("(tool call)");
            format!("{:?}: {}", message.role, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = chars[..max_chars].iter().collect();
    truncated.push('…');
    truncated
}

/// Summarize `older` (the messages about to fall out of the live prompt
/// window) into a single system message, consulting `cache` first and
/// falling back to truncation if the compressor errors.
pub async fn compress_transcript(
    compressor: &dyn Compressor,
    cache: &CompressionCache,
    older: &[Message],
    target_reduction: f32,
    cancel: &CancelToken,
) -> Message {
    if older.is_empty() {
        return Message::system("(no earlier conversation to summarize)");
    }

    let joined = render_transcript(older);
    if let Some(cached) = cache.get(&joined, target_reduction) {
        return Message::system(format!("[earlier conversation, compressed]\n{cached}"));
    }

    match compressor.compress(&joined, target_reduction, cancel).await {
        Ok(summary) => {
            cache.put(&joined, target_reduction, summary.clone());
            Message::system(format!("[earlier conversation, compressed]\n{summary}"))
        }
        Err(err) => {
            tracing::warn!(error = %err, "transcript compression failed, falling back to truncation");
            let budget = ((joined.chars().count() as f32) * target_reduction).ceil() as usize;
            let truncated = truncate_chars(&joined, budget.max(1));
            Message::system(format!("[earlier conversation, truncated]\n{truncated}"))
        }
    }
}

/// Keep the most recent messages whose combined character length fits
/// within `max_chars`, preserving order. Used at the Max compression tier
/// when even the compressed summary plus the live tail overflows the
/// window.
pub fn keep_latest_that_fit(messages: &[Message], max_chars: usize) -> Vec<Message> {
    let mut kept = Vec::new();
    let mut used = 0usize;
    for message in messages.iter().rev() {
        let len = message.content.as_deref().map(str::len).unwrap_or(0);
        if used + len > max_chars && !kept.is_empty() {
            break;
        }
        used += len;
        kept.push(message.clone());
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiq_core::ChatReply;

    struct FakeLlm {
        replies: Mutex<Vec<anyhow::Result<String>>>,
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn chat(&self, _messages: &[Message], _tools: &[aiq_core::ToolDefinition], _cancel: &CancelToken) -> anyhow::Result<ChatReply> {
            match self.replies.lock().unwrap().remove(0) {
                Ok(content) => Ok(ChatReply { content: Some(content), tool_calls: vec![], finish_reason: "stop".into() }),
                Err(err) => Err(err),
            }
        }
    }

    #[test]
    fn cache_keys_differ_by_target_reduction() {
        let cache = CompressionCache::new();
        cache.put("hello", 0.5, "half".into());
        cache.put("hello", 0.7, "seventy".into());
        assert_eq!(cache.get("hello", 0.5).as_deref(), Some("half"));
        assert_eq!(cache.get("hello", 0.7).as_deref(), Some("seventy"));
        assert_eq!(cache.get("other", 0.5), None);
    }

    #[tokio::test]
    async fn llm_compressor_returns_first_nonempty_reply() {
        let llm = FakeLlm { replies: Mutex::new(vec![Ok("a short summary".into())]) };
        let compressor = LlmCompressor { llm: &llm };
        let result = compressor.compress("a long transcript", 0.5, &CancelToken::new()).await.unwrap();
        assert_eq!(result, "a short summary");
    }

    #[tokio::test]
    async fn llm_compressor_retries_once_on_empty_then_fails() {
        let llm = FakeLlm { replies: Mutex::new(vec![Ok(String::new()), Ok(String::new())]) };
        let compressor = LlmCompressor { llm: &llm };
        let result = compressor.compress("text", 0.5, &CancelToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn compress_transcript_falls_back_to_truncation_on_error() {
        let llm = FakeLlm { replies: Mutex::new(vec![Err(anyhow::anyhow!("boom")), Err(anyhow::anyhow!("boom"))]) };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();
        let older = vec![Message::user("a".repeat(100))];
        let result = compress_transcript(&compressor, &cache, &older, 0.5, &CancelToken::new()).await;
        assert!(result.content.unwrap().starts_with("[earlier conversation, truncated]"));
    }

    #[tokio::test]
    async fn compress_transcript_uses_cache_on_second_call() {
        let llm = FakeLlm { replies: Mutex::new(vec![Ok("summary".into())]) };
        let compressor = LlmCompressor { llm: &llm };
        let cache = CompressionCache::new();
        let older = vec![Message::user("repeat me")];
        let first = compress_transcript(&compressor, &cache, &older, 0.5, &CancelToken::new()).await;
        assert!(first.content.unwrap().contains("summary"));
        // second call: FakeLlm has no replies left, so cache must be hit.
        let second = compress_transcript(&compressor, &cache, &older, 0.5, &CancelToken::new()).await;
        assert!(second.content.unwrap().contains("summary"));
    }

    #[test]
    fn keep_latest_that_fit_preserves_order_and_budget() {
        let messages = vec![Message::user("one"), Message::user("two"), Message::user("three")];
        let kept = keep_latest_that_fit(&messages, 6);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].content.as_deref(), Some("three"));
    }

    #[test]
    fn keep_latest_that_fit_always_keeps_at_least_one() {
        let messages = vec![Message::user("a very long message that exceeds the budget")];
        let kept = keep_latest_that_fit(&messages, 1);
        assert_eq!(kept.len(), 1);
    }
}
