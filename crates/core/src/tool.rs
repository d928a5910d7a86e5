//! Tool catalog types shared by the registry, risk assessor, and executor.

use serde::{Deserialize, Serialize};

/// Binary disposition controlling whether a tool call needs confirmation.
///
/// The LLM may also supply `medium`, which the risk assessor folds into
/// `high` (spec.md §4.2) — `RiskHint` models that three-valued wire input
/// separately from the two-valued [`RiskLevel`] the assessor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    High,
}

/// The risk value as it may arrive from the LLM on a tool call's arguments,
/// before the assessor collapses it to a [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskHint {
    Low,
    Medium,
    High,
}

impl RiskHint {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// A single parameter in a tool's JSON-schema parameter definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolParam {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

/// Static catalog metadata for a callable tool.
///
/// `risk_level` is optional on the wire — a tool author may omit it and let
/// the risk assessor's whitelist/default rules decide (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl ToolDefinition {
    /// Render as an OpenAI-compatible `tools` array entry for the LLM call.
    pub fn to_openai_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": "string",
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

/// Taxonomy of structured tool failure, per spec.md §4.3 Error Extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ForeignKeyConstraint,
    SyntaxError,
    PermissionDenied,
    ConnectionError,
    Timeout,
    ResourceNotFound,
    ResourceExists,
    Unknown,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Ok {
        payload: serde_json::Value,
        /// When `true`, the output was already shown to the user directly
        /// (streamed command output, a rendered table/chart) and the
        /// assistant must not restate it.
        displayed: bool,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        error_type: ErrorType,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        affected_resources: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dependencies: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        suggested_actions: Vec<String>,
    },
}

impl ToolResult {
    pub fn ok(payload: serde_json::Value, displayed: bool) -> Self {
        Self::Ok { payload, displayed }
    }

    pub fn error(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            error_code: None,
            error_type,
            affected_resources: Vec::new(),
            dependencies: Vec::new(),
            suggested_actions: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn displayed(&self) -> bool {
        matches!(self, Self::Ok { displayed: true, .. })
    }

    /// Render as the content string for the `tool`-role message fed back to
    /// the LLM.
    pub fn to_tool_message_content(&self) -> String {
        match self {
            Self::Ok { payload, .. } => payload.to_string(),
            Self::Error { .. } => serde_json::to_string(self).unwrap_or_else(|_| self_err_fallback()),
        }
    }
}

fn self_err_fallback() -> String {
    r#"{"status":"error","error":"failed to serialize error","error_type":"unknown"}"#.to_string()
}
