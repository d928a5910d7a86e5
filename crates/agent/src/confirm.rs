//! Confirmation seam for `risk_level=high` tool calls (spec.md §4.7 step
//! 4d). The loop never reads stdin itself — a host (the REPL, a test
//! double) supplies the concrete prompt.

use aiq_core::CancelToken;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    /// Ask the user whether `tool_name(args)` should proceed. `false` means
    /// deny (covers both an explicit "n" and a cancelled turn).
    async fn confirm(&self, tool_name: &str, args: &Value, cancel: &CancelToken) -> bool;
}

/// Denies everything — the conservative default for non-interactive runs.
pub struct AlwaysDeny;

#[async_trait]
impl ConfirmPrompt for AlwaysDeny {
    async fn confirm(&self, _tool_name: &str, _args: &Value, _cancel: &CancelToken) -> bool {
        false
    }
}

/// Approves everything — useful for scripted/non-interactive agent runs
/// where the operator has already accepted the risk out of band.
pub struct AlwaysApprove;

#[async_trait]
impl ConfirmPrompt for AlwaysApprove {
    async fn confirm(&self, _tool_name: &str, _args: &Value, _cancel: &CancelToken) -> bool {
        true
    }
}
