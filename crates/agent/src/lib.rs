//! Agent Loop (spec.md §4.7) — the top-level orchestrator: assemble the
//! prompt, call the LLM, dispatch any requested tool calls in order,
//! journal the outcomes, and repeat until the model stops on its own. The
//! loop never classifies a request as exploratory/definitive itself —
//! that judgment lives entirely in the system prompt the LLM reads
//! (spec.md §9 "LLM-driven polymorphism instead of code heuristics").

pub mod config;
pub mod confirm;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aiq_core::{CancelToken, LlmClient, Message, PromptBudget, RiskLevel, Session, SessionStore, ToolResult};
use aiq_journal::ExecutionJournal;
use aiq_prompt::{CompressionCache, LlmCompressor, PromptAssembler};
use aiq_skills::{match_skills, SkillsStore};
use aiq_tools::{Mode, ToolRegistry};

pub use config::AgentLoopConfig;
pub use confirm::{AlwaysApprove, AlwaysDeny, ConfirmPrompt};

/// Why a turn ended without the LLM reaching a natural stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    StepLimit,
    WallClock,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// The assistant's final visible text, if the turn ended naturally.
    pub final_content: Option<String>,
    pub aborted: Option<AbortReason>,
}

pub struct AgentLoop {
    pub config: AgentLoopConfig,
    pub llm: Arc<dyn LlmClient>,
    pub registry: ToolRegistry,
    pub mode: Mode,
    pub session_store: Arc<dyn SessionStore>,
    journal: ExecutionJournal,
    skills: SkillsStore,
    assembler: PromptAssembler,
    compression_cache: CompressionCache,
    budget: PromptBudget,
    current_turn: u64,
}

impl AgentLoop {
    pub fn new(
        config: AgentLoopConfig,
        llm: Arc<dyn LlmClient>,
        registry: ToolRegistry,
        mode: Mode,
        skills: SkillsStore,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let journal = ExecutionJournal::new(config.journal_capacity);
        let budget = PromptBudget::new(config.context_window_tokens);
        let assembler = PromptAssembler::new("aiq");
        Self {
            config,
            llm,
            registry,
            mode,
            session_store,
            journal,
            skills,
            assembler,
            compression_cache: CompressionCache::new(),
            budget,
            current_turn: 0,
        }
    }

    /// Run one full user turn against `session`, per the contract in
    /// spec.md §4.7. Persists `session` via the configured [`SessionStore`]
    /// before returning, whether the turn ended naturally or aborted.
    pub async fn run_turn(
        &mut self,
        session: &mut Session,
        user_message: String,
        cancel: &CancelToken,
        confirm: &dyn ConfirmPrompt,
    ) -> anyhow::Result<TurnOutcome> {
        self.current_turn += 1;
        self.journal.reset();

        self.match_and_activate_skills(&user_message, cancel).await;

        session.push(Message::user(user_message));

        let outcome = self.run_rounds(session, cancel, confirm).await?;

        self.session_store.save(session).await?;
        Ok(outcome)
    }

    async fn match_and_activate_skills(&mut self, user_message: &str, cancel: &CancelToken) {
        let catalog = self.skills.metadata_listing();
        let catalog_refs: Vec<(&str, &str, &str)> =
            catalog.iter().map(|(id, meta)| (id.as_str(), meta.name.as_str(), meta.description.as_str())).collect();

        let ids = match_skills(user_message, &catalog_refs, Some(self.llm.as_ref()), cancel).await;
        for id in &ids {
            self.skills.activate(id, self.current_turn);
        }

        let protected: HashSet<String> = ids.into_iter().collect();
        self.skills.evict_stale(self.current_turn, self.config.skill_eviction_turns, &protected);
    }

    async fn run_rounds(&mut self, session: &mut Session, cancel: &CancelToken, confirm: &dyn ConfirmPrompt) -> anyhow::Result<TurnOutcome> {
        let turn_start = Instant::now();
        let wall_clock_limit = self.config.turn_wall_clock();
        let mut command_time = Duration::ZERO;

        for round_index in 0..self.config.step_limit_per_turn {
            if cancel.is_cancelled() {
                return Ok(TurnOutcome { final_content: None, aborted: Some(AbortReason::Cancelled) });
            }
            if turn_start.elapsed().saturating_sub(command_time) > wall_clock_limit {
                tracing::warn!(turn = self.current_turn, "turn aborted: wall-clock limit exceeded");
                return Ok(TurnOutcome { final_content: None, aborted: Some(AbortReason::WallClock) });
            }

            let tool_definitions = self.registry.definitions(self.mode);
            let active_skills = self.skills.active_skills();
            let journal_summary = self.journal.summary();
            let compressor = LlmCompressor { llm: self.llm.as_ref() };

            let assembled = self
                .assembler
                .assemble(
                    &mut self.budget,
                    &tool_definitions,
                    &active_skills,
                    &session.messages,
                    &journal_summary,
                    &compressor,
                    &self.compression_cache,
                    cancel,
                    self.current_turn,
                )
                .await;

            let reply = self.llm.chat(&assembled.messages, &tool_definitions, cancel).await?;

            let assistant_message = if reply.tool_calls.is_empty() {
                match &reply.content {
                    Some(content) if !content.is_empty() => Message::assistant_text(content.clone()),
                    _ => Message::assistant_empty(),
                }
            } else {
                Message::assistant_tool_calls(reply.tool_calls.clone())
            };
            session.push(assistant_message);

            if reply.is_terminal() {
                return Ok(TurnOutcome { final_content: reply.content, aborted: None });
            }

            for tool_call in &reply.tool_calls {
                let call_started = Instant::now();
                let result = self.dispatch_tool_call(tool_call, cancel, confirm).await;
                if tool_call.name == "execute_command" {
                    command_time += call_started.elapsed();
                }

                let journal_args = aiq_exec::arg_parse::parse_arguments(&tool_call.raw_arguments)
                    .map(serde_json::Value::Object)
                    .unwrap_or_else(|_| serde_json::json!({"raw_arguments": tool_call.raw_arguments}));
                self.journal.record(&tool_call.name, &journal_args, &result, round_index);

                session.push(Message::tool_result(tool_call.id.clone(), result.to_tool_message_content()));
            }
        }

        tracing::warn!(turn = self.current_turn, "turn aborted: step limit exceeded");
        Ok(TurnOutcome { final_content: None, aborted: Some(AbortReason::StepLimit) })
    }

    async fn dispatch_tool_call(&self, tool_call: &aiq_core::ToolCall, cancel: &CancelToken, confirm: &dyn ConfirmPrompt) -> ToolResult {
        let parsed = aiq_exec::arg_parse::parse_arguments(&tool_call.raw_arguments);
        let risk = match &parsed {
            Ok(map) => aiq_risk::assess(&tool_call.name, &serde_json::Value::Object(map.clone())),
            Err(_) => RiskLevel::High,
        };

        if risk == RiskLevel::High {
            let args_for_prompt = parsed.map(serde_json::Value::Object).unwrap_or(serde_json::Value::Null);
            if !confirm.confirm(&tool_call.name, &args_for_prompt, cancel).await {
                return ToolResult::error(aiq_core::ErrorType::PermissionDenied, "user_denied");
            }
        }

        aiq_exec::execute(&self.registry, tool_call, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiq_core::{ChatReply, ChartRenderer, DbExecutor, QueryResult, TableRenderer, ToolCall};
    use aiq_exec::{AlwaysContinue, ExecutorDeps};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLlm {
        replies: Mutex<Vec<ChatReply>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(&self, _messages: &[Message], _tools: &[aiq_core::ToolDefinition], _cancel: &CancelToken) -> anyhow::Result<ChatReply> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Ok(ChatReply { content: Some(String::new()), tool_calls: vec![], finish_reason: "stop".into() });
            }
            Ok(replies.remove(0))
        }
    }

    struct FakeDb;
    #[async_trait]
    impl DbExecutor for FakeDb {
        async fn execute(&self, _sql: &str) -> anyhow::Result<QueryResult> {
            Ok(QueryResult { columns: vec!["n".into()], rows: vec![] })
        }
    }
    struct FakeChart;
    impl ChartRenderer for FakeChart {
        fn render(&self, _d: &serde_json::Value, _c: Option<&str>, _t: Option<&str>) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }
    struct FakeTable;
    impl TableRenderer for FakeTable {
        fn render(&self, _d: &serde_json::Value, _t: Option<&str>) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    struct NullSessionStore;
    #[async_trait]
    impl SessionStore for NullSessionStore {
        async fn save(&self, _session: &Session) -> anyhow::Result<()> {
            Ok(())
        }
        async fn load(&self, _id: uuid::Uuid) -> anyhow::Result<Session> {
            anyhow::bail!("not implemented")
        }
    }

    fn test_loop(llm_replies: Vec<ChatReply>) -> AgentLoop {
        let dir = tempfile::tempdir().unwrap();
        let registry = aiq_exec::build_registry(ExecutorDeps {
            db: Arc::new(FakeDb),
            chart_renderer: Arc::new(FakeChart),
            table_renderer: Arc::new(FakeTable),
            sandbox_root: dir.into_path(),
            idle_timeout: Duration::from_secs(60),
            idle_confirm: Arc::new(AlwaysContinue),
        });
        let skills_dir = tempfile::tempdir().unwrap();
        let skills = SkillsStore::scan(skills_dir.path());
        AgentLoop::new(
            AgentLoopConfig::default(),
            Arc::new(ScriptedLlm { replies: Mutex::new(llm_replies) }),
            registry,
            Mode::Database,
            skills,
            Arc::new(NullSessionStore),
        )
    }

    #[tokio::test]
    async fn terminal_reply_with_no_tool_calls_ends_turn() {
        let mut agent = test_loop(vec![ChatReply { content: Some("hello back".into()), tool_calls: vec![], finish_reason: "stop".into() }]);
        let mut session = Session::new(None, None);
        let outcome = agent.run_turn(&mut session, "hi".into(), &CancelToken::new(), &AlwaysDeny).await.unwrap();
        assert_eq!(outcome.final_content.as_deref(), Some("hello back"));
        assert!(outcome.aborted.is_none());
    }

    #[tokio::test]
    async fn low_risk_tool_call_auto_executes_without_confirmation() {
        let call = ToolCall::new("execute_sql", r#"{"sql":"SELECT 1"}"#);
        let mut agent = test_loop(vec![
            ChatReply { content: None, tool_calls: vec![call], finish_reason: "tool_calls".into() },
            ChatReply { content: Some("done".into()), tool_calls: vec![], finish_reason: "stop".into() },
        ]);
        let mut session = Session::new(None, None);
        // AlwaysDeny would fail the turn if confirmation were (wrongly) requested.
        let outcome = agent.run_turn(&mut session, "show tables".into(), &CancelToken::new(), &AlwaysDeny).await.unwrap();
        assert_eq!(outcome.final_content.as_deref(), Some("done"));
        let tool_message = session.messages.iter().find(|m| m.tool_call_id.is_some()).unwrap();
        assert!(!tool_message.content.as_deref().unwrap_or_default().contains("user_denied"));
    }

    #[tokio::test]
    async fn high_risk_tool_call_denied_becomes_permission_error() {
        let call = ToolCall::new("execute_sql", r#"{"sql":"DROP TABLE orders","risk_level":"high"}"#);
        let mut agent = test_loop(vec![
            ChatReply { content: None, tool_calls: vec![call], finish_reason: "tool_calls".into() },
            ChatReply { content: Some("ok, not dropped".into()), tool_calls: vec![], finish_reason: "stop".into() },
        ]);
        let mut session = Session::new(None, None);
        let outcome = agent.run_turn(&mut session, "drop orders".into(), &CancelToken::new(), &AlwaysDeny).await.unwrap();
        assert_eq!(outcome.final_content.as_deref(), Some("ok, not dropped"));
        let tool_message = session.messages.iter().find(|m| m.tool_call_id.is_some()).unwrap();
        assert!(tool_message.content.as_deref().unwrap_or_default().contains("permission_denied"));
    }

    #[tokio::test]
    async fn step_limit_aborts_runaway_loop() {
        let mut config = AgentLoopConfig::default();
        config.step_limit_per_turn = 2;
        let dir = tempfile::tempdir().unwrap();
        let registry = aiq_exec::build_registry(ExecutorDeps {
            db: Arc::new(FakeDb),
            chart_renderer: Arc::new(FakeChart),
            table_renderer: Arc::new(FakeTable),
            sandbox_root: dir.into_path(),
            idle_timeout: Duration::from_secs(60),
            idle_confirm: Arc::new(AlwaysContinue),
        });
        let skills_dir = tempfile::tempdir().unwrap();
        let always_tool_calls: Vec<ChatReply> = (0..10)
            .map(|_| ChatReply {
                content: None,
                tool_calls: vec![ToolCall::new("execute_sql", r#"{"sql":"SELECT 1"}"#)],
                finish_reason: "tool_calls".into(),
            })
            .collect();
        let mut agent = AgentLoop::new(
            config,
            Arc::new(ScriptedLlm { replies: Mutex::new(always_tool_calls) }),
            registry,
            Mode::Database,
            SkillsStore::scan(skills_dir.path()),
            Arc::new(NullSessionStore),
        );
        let mut session = Session::new(None, None);
        let outcome = agent.run_turn(&mut session, "loop forever".into(), &CancelToken::new(), &AlwaysDeny).await.unwrap();
        assert_eq!(outcome.aborted, Some(AbortReason::StepLimit));
    }

    /// spec.md §8 scenario: a first attempt fails with a dependency error,
    /// the LLM retries with a corrected call in the next round, and the
    /// turn ends on the retry's success — all within one `run_turn`.
    #[tokio::test]
    async fn dependency_error_is_resolved_by_a_retry_in_the_next_round() {
        struct FlakyDb;
        #[async_trait]
        impl DbExecutor for FlakyDb {
            async fn execute(&self, sql: &str) -> anyhow::Result<QueryResult> {
                if sql.contains("orders") {
                    anyhow::bail!("cannot drop table 'customers' because it is referenced by rows on table 'orders'");
                }
                Ok(QueryResult { columns: vec!["n".into()], rows: vec![] })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let registry = aiq_exec::build_registry(ExecutorDeps {
            db: Arc::new(FlakyDb),
            chart_renderer: Arc::new(FakeChart),
            table_renderer: Arc::new(FakeTable),
            sandbox_root: dir.into_path(),
            idle_timeout: Duration::from_secs(60),
            idle_confirm: Arc::new(AlwaysContinue),
        });
        let skills_dir = tempfile::tempdir().unwrap();

        let first_call = ToolCall::new("execute_sql", r#"{"sql":"DROP TABLE customers","risk_level":"low"}"#);
        let retry_call = ToolCall::new("execute_sql", r#"{"sql":"DROP TABLE orders, customers","risk_level":"low"}"#);
        let mut agent = AgentLoop::new(
            AgentLoopConfig::default(),
            Arc::new(ScriptedLlm {
                replies: Mutex::new(vec![
                    ChatReply { content: None, tool_calls: vec![first_call], finish_reason: "tool_calls".into() },
                    ChatReply { content: None, tool_calls: vec![retry_call], finish_reason: "tool_calls".into() },
                    ChatReply { content: Some("dropped both tables".into()), tool_calls: vec![], finish_reason: "stop".into() },
                ]),
            }),
            registry,
            Mode::Database,
            SkillsStore::scan(skills_dir.path()),
            Arc::new(NullSessionStore),
        );

        let mut session = Session::new(None, None);
        let outcome = agent
            .run_turn(&mut session, "drop customers".into(), &CancelToken::new(), &AlwaysApprove)
            .await
            .unwrap();

        assert_eq!(outcome.final_content.as_deref(), Some("dropped both tables"));
        assert!(outcome.aborted.is_none());

        let tool_messages: Vec<_> = session.messages.iter().filter(|m| m.tool_call_id.is_some()).collect();
        assert_eq!(tool_messages.len(), 2);
        assert!(tool_messages[0].content.as_deref().unwrap_or_default().contains("foreign_key_constraint"));
        assert!(!tool_messages[1].content.as_deref().unwrap_or_default().contains("error"));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_immediately() {
        let mut agent = test_loop(vec![ChatReply { content: Some("unreachable".into()), tool_calls: vec![], finish_reason: "stop".into() }]);
        let mut session = Session::new(None, None);
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = agent.run_turn(&mut session, "hi".into(), &cancel, &AlwaysDeny).await.unwrap();
        assert_eq!(outcome.aborted, Some(AbortReason::Cancelled));
    }
}
