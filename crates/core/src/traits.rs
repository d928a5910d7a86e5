//! External collaborator interfaces. Concrete implementations (DB drivers,
//! chart renderers, the YAML/JSON session codec) are out of the core's
//! scope per spec.md §1 — only the trait boundary lives here.

use async_trait::async_trait;

use crate::message::Message;
use crate::session::Session;
use crate::tool::ToolDefinition;

/// Cooperative cancellation token threaded from the current turn down into
/// an in-flight LLM call or tool execution (spec.md §5 "Cancellation").
#[derive(Debug, Clone, Default)]
pub struct CancelToken(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Reply from one `chat()` call — content plus any requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: Option<String>,
    pub tool_calls: Vec<crate::message::ToolCall>,
    /// `"stop"`, `"tool_calls"`, `"length"`, etc. Only `"stop"` with no
    /// pending tool calls ends a turn (spec.md §4.7).
    pub finish_reason: String,
}

impl ChatReply {
    pub fn is_terminal(&self) -> bool {
        self.finish_reason == "stop" && self.tool_calls.is_empty()
    }
}

/// The single method the core needs from an LLM backend (spec.md §6).
///
/// Callers are expected to retry transient failures with backoff
/// themselves (the default `aiq-llm::HttpLlmClient` does); this trait
/// models only the logical call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
        cancel: &CancelToken,
    ) -> anyhow::Result<ChatReply>;
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Abstract SQL executor (spec.md §6) — concrete MySQL/Postgres/SeekDB
/// drivers are out of scope.
#[async_trait]
pub trait DbExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> anyhow::Result<QueryResult>;
}

/// Abstract chart renderer — concrete bar/line/pie/scatter algorithms are
/// out of scope (spec.md §1).
pub trait ChartRenderer: Send + Sync {
    fn render(
        &self,
        data: &serde_json::Value,
        chart_type: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<String>;
}

/// Abstract table renderer, same scope boundary as [`ChartRenderer`].
pub trait TableRenderer: Send + Sync {
    fn render(&self, data: &serde_json::Value, title: Option<&str>) -> anyhow::Result<String>;
}

/// Abstract persistence for [`Session`] blobs. The concrete JSON codec and
/// atomic-write mechanics live in `aiq-session`; the core only needs the
/// seam so `aiq-agent` can depend on a trait object.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> anyhow::Result<()>;
    async fn load(&self, id: uuid::Uuid) -> anyhow::Result<Session>;
}
