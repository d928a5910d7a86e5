//! Shared journal entry type. The bounded ring-buffer *behavior* lives in
//! `aiq-journal`; this crate only owns the data shape so that `aiq-prompt`
//! (which renders the summary block) doesn't need to depend on the journal
//! crate's internals.

use serde::{Deserialize, Serialize};

use crate::tool::ErrorType;

/// A resource-level effect detected from a successful tool call, per
/// spec.md §4.4 "State-change detection".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateChange {
    ResourceCreated { resource: String },
    ResourceDeleted { resource: String },
    ResourceModified { resource: String },
}

impl StateChange {
    pub fn resource(&self) -> &str {
        match self {
            Self::ResourceCreated { resource }
            | Self::ResourceDeleted { resource }
            | Self::ResourceModified { resource } => resource,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ResourceCreated { resource } => format!("`{resource}` created"),
            Self::ResourceDeleted { resource } => format!("`{resource}` dropped"),
            Self::ResourceModified { resource } => format!("`{resource}` altered"),
        }
    }
}

/// Structured error info surfaced alongside a failed journal entry —
/// mirrors the error fields of [`crate::tool::ToolResult::Error`] without
/// re-carrying the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error_type: ErrorType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// One row of the Execution Journal ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub tool_name: String,
    /// Hex digest of the canonicalised arguments (sha256), not the raw args
    /// — keeps journal entries small per spec.md §4.4.
    pub arguments_digest: String,
    pub status: JournalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_change: Option<StateChange>,
    pub round_index: usize,
    /// How many tool calls ago this entry was appended (0 = most recent).
    /// Recomputed on read, not stored across appends.
    #[serde(default)]
    pub age_in_queries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    Ok,
    Error,
}
