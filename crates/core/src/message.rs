//! The canonical conversation transcript types.
//!
//! [`Message`] is what gets persisted verbatim in a [`crate::session::Session`];
//! the prompt assembler in `aiq-prompt` is the only place a *compressed*
//! projection of these is built for the LLM call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single element of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Present only on `role: Tool` messages — correlates to the
    /// `ToolCall.id` it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// An assistant message that requests tool calls. Per the invariant in
    /// `spec.md` §3, every `tool_call` here must be answered by exactly one
    /// `tool` message carrying the same id before the next assistant turn.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// An empty-content assistant message — the valid terminator after a
    /// `displayed=true` tool result (spec.md §4.7 "Critical rules").
    pub fn assistant_empty() -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call requested by the assistant.
///
/// `raw_arguments` is exactly the string the LLM returned — recursive
/// unquoting (spec.md §4.3) happens downstream in `aiq-exec`, not here, so
/// the raw form is always available for error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub raw_arguments: String,
    /// Parsed once the executor has unwrapped `raw_arguments`. `None` until
    /// parsing has happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_arguments: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, raw_arguments: impl Into<String>) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            raw_arguments: raw_arguments.into(),
            parsed_arguments: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_tool_calls_has_no_content() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new("execute_sql", "{}")]);
        assert!(msg.content.is_none());
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn tool_result_carries_matching_id() {
        let call = ToolCall::new("execute_sql", "{}");
        let result = Message::tool_result(call.id.clone(), "ok");
        assert_eq!(result.tool_call_id.as_deref(), Some(call.id.as_str()));
    }

    #[test]
    fn round_trips_through_json() {
        let msg = Message::user("hello");
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.role, Role::User);
        assert_eq!(decoded.content.as_deref(), Some("hello"));
        assert_eq!(decoded.timestamp, msg.timestamp);
    }
}
