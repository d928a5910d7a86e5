//! Execution Journal — spec.md §4.4.
//!
//! Bounded ring of the last `capacity` tool invocations for the current
//! turn, plus the rendering of the `<TOOL_EXECUTION_SUMMARY>` block that
//! `aiq-prompt` injects into every round.

pub mod digest;
pub mod state_change;

use std::collections::VecDeque;

use aiq_core::{ErrorInfo, JournalEntry, JournalStatus, ToolResult};

const SUMMARY_MAX_BULLETS: usize = 5;
const SUMMARY_MAX_CHARS: usize = 120;

pub struct ExecutionJournal {
    capacity: usize,
    entries: VecDeque<JournalEntry>,
}

impl ExecutionJournal {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Clear the journal at the start of a new user turn (spec.md §4.4 "The
    /// journal is cleared at the start of each user turn").
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Record one tool invocation's outcome, evicting the oldest entry if
    /// the ring is already at capacity.
    pub fn record(&mut self, tool_name: &str, args: &serde_json::Value, result: &ToolResult, round_index: usize) {
        let arguments_digest = digest::digest_arguments(args);

        let (status, error_info, state_change) = match result {
            ToolResult::Ok { .. } => (JournalStatus::Ok, None, state_change::detect(tool_name, args)),
            ToolResult::Error { error, error_type, dependencies, .. } => (
                JournalStatus::Error,
                Some(ErrorInfo { error_type: *error_type, message: error.clone(), dependencies: dependencies.clone() }),
                None,
            ),
        };

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(JournalEntry {
            tool_name: tool_name.to_string(),
            arguments_digest,
            status,
            error_info,
            state_change,
            round_index,
            age_in_queries: 0,
        });
        tracing::debug!(tool = tool_name, round_index, "journal entry recorded");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest-first, with `age_in_queries` recomputed relative to
    /// the most recent entry (0 = just recorded).
    pub fn entries(&self) -> Vec<JournalEntry> {
        let total = self.entries.len();
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut entry = entry.clone();
                entry.age_in_queries = total - 1 - idx;
                entry
            })
            .collect()
    }

    /// Render the `<TOOL_EXECUTION_SUMMARY>` body: up to 5 bullets, each
    /// truncated to 120 chars, most recent last.
    pub fn summary(&self) -> String {
        self.entries()
            .iter()
            .rev()
            .take(SUMMARY_MAX_BULLETS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(render_bullet)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_bullet(entry: &JournalEntry) -> String {
    let body = match (&entry.status, &entry.error_info, &entry.state_change) {
        (JournalStatus::Ok, _, Some(change)) => format!("{} ok — {}", entry.tool_name, change.describe()),
        (JournalStatus::Ok, _, None) => format!("{} ok", entry.tool_name),
        (JournalStatus::Error, Some(err), _) => format!("{} failed ({:?}): {}", entry.tool_name, err.error_type, err.message),
        (JournalStatus::Error, None, _) => format!("{} failed", entry.tool_name),
    };
    let truncated = truncate_chars(&body, SUMMARY_MAX_CHARS);
    format!("- {truncated}")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
