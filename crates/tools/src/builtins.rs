//! Static catalog for the six built-in tools (spec.md §4.1).
//!
//! Only the JSON-schema definitions live here; the dispatch logic behind
//! each name is implemented in `aiq-exec`, which has the injected
//! `DbExecutor`/`ChartRenderer`/`TableRenderer`/sandbox the handlers need.

use aiq_core::{ToolDefinition, ToolParam};

const RISK_LEVEL_DOC: &str =
    "Optional risk override: low executes automatically, medium or high require user confirmation.";

/// The shared "don't re-query" steering language referenced in spec.md
/// §4.1: "Descriptions must steer the LLM to use existing query results
/// already visible in conversation history rather than re-querying."
const REUSE_RESULTS_HINT: &str =
    " Prefer reusing results already visible earlier in the conversation instead of re-running an equivalent call.";

pub fn builtin_definitions() -> Vec<ToolDefinition> {
    vec![
        execute_sql(),
        execute_command(),
        http_request(),
        file_operations(),
        render_chart(),
        render_table(),
    ]
}

fn execute_sql() -> ToolDefinition {
    ToolDefinition {
        name: "execute_sql".to_string(),
        description: format!(
            "Run a SQL statement against the connected data source and return its tabular result.{REUSE_RESULTS_HINT}"
        ),
        params: vec![
            ToolParam::required("sql", "The SQL statement to execute."),
            ToolParam::optional("risk_level", RISK_LEVEL_DOC),
        ],
        risk_level: None,
    }
}

fn execute_command() -> ToolDefinition {
    ToolDefinition {
        name: "execute_command".to_string(),
        description: "Run a shell command and stream its output to the user.".to_string(),
        params: vec![
            ToolParam::required("command", "The shell command line to execute."),
            ToolParam::optional("risk_level", RISK_LEVEL_DOC),
        ],
        risk_level: None,
    }
}

fn http_request() -> ToolDefinition {
    ToolDefinition {
        name: "http_request".to_string(),
        description: format!("Perform an HTTP request and return status, headers, and a body snippet.{REUSE_RESULTS_HINT}"),
        params: vec![
            ToolParam::required("method", "HTTP method, e.g. GET or POST."),
            ToolParam::required("url", "Target URL."),
            ToolParam::optional("headers", "JSON object of request headers."),
            ToolParam::optional("body", "Request body, if any."),
            ToolParam::optional("risk_level", RISK_LEVEL_DOC),
        ],
        risk_level: None,
    }
}

fn file_operations() -> ToolDefinition {
    ToolDefinition {
        name: "file_operations".to_string(),
        description: "Read, write, list, or check existence of a file within the sandbox root.".to_string(),
        params: vec![
            ToolParam::required("operation", "One of: read, write, list, exists."),
            ToolParam::required("path", "Path relative to the sandbox root."),
            ToolParam::optional("content", "Content to write (operation=write only)."),
            ToolParam::optional("risk_level", RISK_LEVEL_DOC),
        ],
        risk_level: None,
    }
}

fn render_chart() -> ToolDefinition {
    ToolDefinition {
        name: "render_chart".to_string(),
        description: "Render tabular data as a chart for the user. Always shown directly; do not restate it in text.".to_string(),
        params: vec![
            ToolParam::required("data", "The data to chart, as a JSON value."),
            ToolParam::optional("chart_type", "bar, line, pie, or scatter."),
            ToolParam::optional("title", "Chart title."),
        ],
        risk_level: None,
    }
}

fn render_table() -> ToolDefinition {
    ToolDefinition {
        name: "render_table".to_string(),
        description: "Render tabular data as a formatted table for the user. Always shown directly; do not restate it in text.".to_string(),
        params: vec![
            ToolParam::required("data", "The data to render, as a JSON value."),
            ToolParam::optional("title", "Table title."),
        ],
        risk_level: None,
    }
}
