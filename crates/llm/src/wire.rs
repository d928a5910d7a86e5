//! OpenAI-compatible `/chat/completions` wire shapes, mirroring the
//! grounding repo's `aigent-llm::ChatMessage`/`ToolCall`/`ToolCallFunction`
//! but generalized to a single configurable provider instead of two
//! hardcoded ones.

use aiq_core::{Message, Role, ToolCall as CoreToolCall};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => Self::System,
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
            Role::Tool => Self::Tool,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
            tool_calls: message.tool_calls.iter().map(WireToolCall::from_core).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_tool_call_type", rename = "type")]
    pub kind: String,
    pub function: WireToolCallFunction,
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCallFunction {
    pub name: String,
    /// Arguments as the provider returns them — a JSON string for most
    /// OpenAI-compatible APIs, occasionally a pre-parsed object. Kept as
    /// `serde_json::Value` and stringified on the way into
    /// [`aiq_core::ToolCall::raw_arguments`]; the executor's recursive
    /// unquoting (spec.md §4.3) handles the rest.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl WireToolCall {
    fn from_core(call: &CoreToolCall) -> Self {
        let arguments = serde_json::from_str(&call.raw_arguments)
            .unwrap_or_else(|_| serde_json::Value::String(call.raw_arguments.clone()));
        Self {
            id: call.id.clone(),
            kind: default_tool_call_type(),
            function: WireToolCallFunction { name: call.name.clone(), arguments },
        }
    }

    pub fn into_core(self) -> CoreToolCall {
        let raw_arguments = match &self.function.arguments {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        CoreToolCall {
            id: if self.id.is_empty() {
                format!("call_{}", uuid::Uuid::new_v4().simple())
            } else {
                self.id
            },
            name: self.function.name,
            raw_arguments,
            parsed_arguments: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}
