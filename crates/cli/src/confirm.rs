//! Real stdin-backed confirmation prompts — the two interactive seams the
//! core leaves abstract: high-risk tool confirmation (spec.md §4.2/§4.7
//! step 4d) and the idle-timeout "still running?" prompt for
//! `execute_command` (spec.md §4.3, §5).

use std::io::Write;
use std::time::Duration;

use aiq_agent::ConfirmPrompt;
use aiq_core::CancelToken;
use aiq_exec::IdleConfirm;
use async_trait::async_trait;
use serde_json::Value;

pub struct StdinConfirmPrompt;

#[async_trait]
impl ConfirmPrompt for StdinConfirmPrompt {
    async fn confirm(&self, tool_name: &str, args: &Value, _cancel: &CancelToken) -> bool {
        print!("about to run {tool_name}({args}) — proceed? [y/N] ");
        std::io::stdout().flush().ok();
        read_yes_no()
    }
}

#[async_trait]
impl IdleConfirm for StdinConfirmPrompt {
    async fn confirm_continue(&self, elapsed: Duration) -> bool {
        print!("command has produced no output for {}s — keep waiting? [y/N] ", elapsed.as_secs());
        std::io::stdout().flush().ok();
        read_yes_no()
    }
}

fn read_yes_no() -> bool {
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
