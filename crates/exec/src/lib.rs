//! Tool Executor (spec.md §4.3) — argument parsing, error extraction, and
//! the six built-in tool handlers wired against their injected
//! collaborators.

pub mod arg_parse;
pub mod command;
pub mod error_extraction;
pub mod file_ops;
pub mod http;
pub mod render;
pub mod sql;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aiq_core::{CancelToken, ChartRenderer, DbExecutor, ErrorType, TableRenderer, ToolCall, ToolResult};
use aiq_tools::{builtin_definitions, ToolRegistry};

pub use command::{AlwaysContinue, CommandHandler, IdleConfirm};

/// Everything the executor needs to construct handlers for the six
/// built-in tools (spec.md §4.1).
pub struct ExecutorDeps {
    pub db: Arc<dyn DbExecutor>,
    pub chart_renderer: Arc<dyn ChartRenderer>,
    pub table_renderer: Arc<dyn TableRenderer>,
    pub sandbox_root: PathBuf,
    pub idle_timeout: Duration,
    pub idle_confirm: Arc<dyn IdleConfirm>,
}

/// Build a [`ToolRegistry`] with all six built-ins registered against
/// `deps`.
pub fn build_registry(deps: ExecutorDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let definitions = builtin_definitions();

    for definition in definitions {
        let handler: Arc<dyn aiq_tools::ToolHandler> = match definition.name.as_str() {
            "execute_sql" => Arc::new(sql::SqlHandler { db: Arc::clone(&deps.db) }),
            "execute_command" => Arc::new(CommandHandler::new(deps.idle_timeout, Arc::clone(&deps.idle_confirm))),
            "http_request" => Arc::new(http::HttpHandler::default()),
            "file_operations" => Arc::new(file_ops::FileOpsHandler { sandbox_root: deps.sandbox_root.clone() }),
            "render_chart" => Arc::new(render::RenderChartHandler { renderer: Arc::clone(&deps.chart_renderer) }),
            "render_table" => Arc::new(render::RenderTableHandler { renderer: Arc::clone(&deps.table_renderer) }),
            other => {
                tracing::warn!(tool = other, "no handler wired for built-in definition, skipping");
                continue;
            }
        };
        registry.register(definition, handler);
    }

    registry
}

/// Parse a tool call's raw arguments, dispatch to its registered handler,
/// and return the structured result. This is the single entry point the
/// Agent Loop calls per tool call (spec.md §4.7 step 4d).
pub async fn execute(registry: &ToolRegistry, tool_call: &ToolCall, cancel: &CancelToken) -> ToolResult {
    let args = match arg_parse::parse_arguments(&tool_call.raw_arguments) {
        Ok(args) => args,
        Err(err) => return ToolResult::error(ErrorType::Unknown, err.message),
    };

    let Some(handler) = registry.lookup(&tool_call.name) else {
        return ToolResult::error(ErrorType::ResourceNotFound, format!("no such tool: {}", tool_call.name));
    };

    tracing::info!(tool = %tool_call.name, "tool dispatched");
    match handler.call(&args, cancel).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(tool = %tool_call.name, error = %err, "tool handler failed");
            ToolResult::error(ErrorType::Unknown, err.to_string())
        }
    }
}
