//! Streaming `execute_command` with an idle-timeout watchdog (spec.md §4.3,
//! §5). Two cooperative tasks: an output pump that forwards bytes to the
//! caller and "pings" an `Arc<Notify>` on every chunk, and a watchdog that
//! races `notify.notified()` against a sleep so the idle prompt never
//! blocks the pump.

use std::sync::Arc;
use std::time::Duration;

use aiq_core::{CancelToken, ToolResult};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Notify};

use aiq_tools::ToolHandler;

const OUTPUT_CAP_BYTES: usize = 32_768;
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Confirms whether a stalled command should keep running. The CLI host
/// implements this against a real terminal prompt; tests use a canned
/// answer.
#[async_trait]
pub trait IdleConfirm: Send + Sync {
    async fn confirm_continue(&self, elapsed: Duration) -> bool;
}

/// Always answers `y` — used where no interactive terminal is available.
pub struct AlwaysContinue;

#[async_trait]
impl IdleConfirm for AlwaysContinue {
    async fn confirm_continue(&self, _elapsed: Duration) -> bool {
        true
    }
}

pub struct CommandHandler {
    idle_timeout: Duration,
    confirm: Arc<dyn IdleConfirm>,
}

impl CommandHandler {
    pub fn new(idle_timeout: Duration, confirm: Arc<dyn IdleConfirm>) -> Self {
        Self { idle_timeout, confirm }
    }
}

enum CommandEvent {
    Output(Vec<u8>),
    Exited(std::process::ExitStatus),
}

#[async_trait]
impl ToolHandler for CommandHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(command) = args.get("command").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(aiq_core::ErrorType::Unknown, "execute_command requires a \"command\" string argument"));
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        let pid = child.id();

        let (tx, mut rx) = mpsc::channel::<CommandEvent>(64);
        let notify = Arc::new(Notify::new());

        spawn_line_pump(stdout, tx.clone(), Arc::clone(&notify));
        spawn_line_pump(stderr, tx.clone(), Arc::clone(&notify));
        spawn_wait(child, tx);

        let mut captured: Vec<u8> = Vec::new();
        let mut exit_status: Option<std::process::ExitStatus> = None;
        let mut cancelled_by_user = false;

        'drain: loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(CommandEvent::Output(bytes)) => {
                            print!("{}", String::from_utf8_lossy(&bytes));
                            append_capped(&mut captured, &bytes, OUTPUT_CAP_BYTES);
                        }
                        Some(CommandEvent::Exited(status)) => {
                            exit_status = Some(status);
                            break 'drain;
                        }
                        None => break 'drain,
                    }
                }
                _ = notify.notified() => {
                    // a chunk arrived; loop back and let rx.recv() pick it up
                }
                _ = tokio::time::sleep(self.idle_timeout) => {
                    tracing::info!("execute_command idle for {:?}, prompting", self.idle_timeout);
                    if cancel.is_cancelled() || !self.confirm.confirm_continue(self.idle_timeout).await {
                        cancelled_by_user = true;
                        terminate(pid);
                        break 'drain;
                    }
                }
            }
        }

        let output_snippet = String::from_utf8_lossy(&captured).to_string();
        if cancelled_by_user {
            return Ok(ToolResult::error(aiq_core::ErrorType::Unknown, "command cancelled after idle timeout"));
        }

        let status = exit_status.unwrap_or_else(|| {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                std::process::ExitStatus::from_raw(-1)
            }
            #[cfg(not(unix))]
            {
                std::process::ExitStatus::default()
            }
        });

        if status.success() {
            Ok(ToolResult::ok(serde_json::json!({"exit_code": status.code(), "output": output_snippet}), true))
        } else {
            let extracted = crate::error_extraction::extract(&output_snippet);
            Ok(ToolResult::Error {
                error: output_snippet,
                error_code: status.code().map(|c| c.to_string()),
                error_type: extracted.error_type,
                affected_resources: extracted.affected_resources,
                dependencies: extracted.dependencies,
                suggested_actions: Vec::new(),
            })
        }
    }
}

fn spawn_line_pump(reader: impl tokio::io::AsyncRead + Unpin + Send + 'static, tx: mpsc::Sender<CommandEvent>, notify: Arc<Notify>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            notify.notify_one();
            if tx.send(CommandEvent::Output(bytes)).await.is_err() {
                break;
            }
        }
    });
}

fn spawn_wait(mut child: tokio::process::Child, tx: mpsc::Sender<CommandEvent>) {
    tokio::spawn(async move {
        if let Ok(status) = child.wait().await {
            let _ = tx.send(CommandEvent::Exited(status)).await;
        }
    });
}

fn append_capped(dest: &mut Vec<u8>, bytes: &[u8], cap: usize) {
    if dest.len() >= cap {
        return;
    }
    let remaining = cap - dest.len();
    dest.extend_from_slice(&bytes[..bytes.len().min(remaining)]);
}

/// SIGTERM, then SIGKILL after a grace period (spec.md §4.3, §5).
fn terminate(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    #[cfg(unix)]
    {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        let pid = pid as i32;
        tokio::spawn(async move {
            tokio::time::sleep(KILL_GRACE).await;
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
        });
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn args(command: &str) -> Map<String, serde_json::Value> {
        let serde_json::Value::Object(map) = json!({"command": command}) else { unreachable!() };
        map
    }

    #[tokio::test]
    async fn successful_command_sets_displayed_true() {
        let handler = CommandHandler::new(Duration::from_secs(60), Arc::new(AlwaysContinue));
        let result = handler.call(&args("echo hi"), &CancelToken::new()).await.unwrap();
        assert!(result.displayed());
    }

    #[tokio::test]
    async fn failing_command_is_structured_error() {
        let handler = CommandHandler::new(Duration::from_secs(60), Arc::new(AlwaysContinue));
        let result = handler.call(&args("exit 7"), &CancelToken::new()).await.unwrap();
        assert!(result.is_error());
    }

    struct AlwaysDeny;
    #[async_trait]
    impl IdleConfirm for AlwaysDeny {
        async fn confirm_continue(&self, _elapsed: Duration) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn idle_timeout_with_denial_terminates_command() {
        let handler = CommandHandler::new(Duration::from_millis(20), Arc::new(AlwaysDeny));
        let result = handler.call(&args("sleep 5"), &CancelToken::new()).await.unwrap();
        assert!(result.is_error());
    }
}
