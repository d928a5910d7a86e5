//! `execute_sql` handler (spec.md §4.3) — delegates to the injected
//! [`DbExecutor`], which is opaque to the core (spec.md §1, §6).

use std::sync::Arc;

use aiq_core::{CancelToken, DbExecutor, ErrorType, ToolResult};
use async_trait::async_trait;
use aiq_tools::ToolHandler;

pub struct SqlHandler {
    pub db: Arc<dyn DbExecutor>,
}

#[async_trait]
impl ToolHandler for SqlHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(sql) = args.get("sql").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(ErrorType::Unknown, "execute_sql requires a \"sql\" argument"));
        };

        match self.db.execute(sql).await {
            Ok(result) => Ok(ToolResult::ok(
                serde_json::json!({"columns": result.columns, "rows": result.rows}),
                true,
            )),
            Err(err) => {
                let extracted = crate::error_extraction::extract(&err.to_string());
                Ok(ToolResult::Error {
                    error: err.to_string(),
                    error_code: None,
                    error_type: extracted.error_type,
                    affected_resources: extracted.affected_resources,
                    dependencies: extracted.dependencies,
                    suggested_actions: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiq_core::QueryResult;
    use serde_json::{json, Map};

    struct FakeDb {
        fail: bool,
    }

    #[async_trait]
    impl DbExecutor for FakeDb {
        async fn execute(&self, _sql: &str) -> anyhow::Result<QueryResult> {
            if self.fail {
                anyhow::bail!("table 'orders' doesn't exist");
            }
            Ok(QueryResult { columns: vec!["id".into()], rows: vec![vec![json!(1)]] })
        }
    }

    fn args(sql: &str) -> Map<String, serde_json::Value> {
        let serde_json::Value::Object(map) = json!({"sql": sql}) else { unreachable!() };
        map
    }

    #[tokio::test]
    async fn success_sets_displayed_true() {
        let handler = SqlHandler { db: Arc::new(FakeDb { fail: false }) };
        let result = handler.call(&args("SELECT 1"), &CancelToken::new()).await.unwrap();
        assert!(result.displayed());
    }

    #[tokio::test]
    async fn failure_is_extracted_into_structured_error() {
        let handler = SqlHandler { db: Arc::new(FakeDb { fail: true }) };
        let result = handler.call(&args("SELECT * FROM orders"), &CancelToken::new()).await.unwrap();
        match result {
            ToolResult::Error { error_type, .. } => assert_eq!(error_type, ErrorType::ResourceNotFound),
            ToolResult::Ok { .. } => panic!("expected error"),
        }
    }
}
