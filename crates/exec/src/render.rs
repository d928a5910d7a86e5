//! `render_chart` / `render_table` handlers (spec.md §4.3) — thin adapters
//! over the injected [`ChartRenderer`]/[`TableRenderer`] traits, both out of
//! the core's scope (spec.md §1).

use std::sync::Arc;

use aiq_core::{CancelToken, ChartRenderer, ErrorType, TableRenderer, ToolResult};
use async_trait::async_trait;
use aiq_tools::ToolHandler;

pub struct RenderChartHandler {
    pub renderer: Arc<dyn ChartRenderer>,
}

#[async_trait]
impl ToolHandler for RenderChartHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(data) = args.get("data") else {
            return Ok(ToolResult::error(ErrorType::Unknown, "render_chart requires a \"data\" argument"));
        };
        let chart_type = args.get("chart_type").and_then(|v| v.as_str());
        let title = args.get("title").and_then(|v| v.as_str());

        match self.renderer.render(data, chart_type, title) {
            Ok(rendered) => {
                println!("{rendered}");
                Ok(ToolResult::ok(serde_json::json!({"rendered": true}), true))
            }
            Err(err) => Ok(ToolResult::error(ErrorType::Unknown, err.to_string())),
        }
    }
}

pub struct RenderTableHandler {
    pub renderer: Arc<dyn TableRenderer>,
}

#[async_trait]
impl ToolHandler for RenderTableHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(data) = args.get("data") else {
            return Ok(ToolResult::error(ErrorType::Unknown, "render_table requires a \"data\" argument"));
        };
        let title = args.get("title").and_then(|v| v.as_str());

        match self.renderer.render(data, title) {
            Ok(rendered) => {
                println!("{rendered}");
                Ok(ToolResult::ok(serde_json::json!({"rendered": true}), true))
            }
            Err(err) => Ok(ToolResult::error(ErrorType::Unknown, err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    struct FakeChart;
    impl ChartRenderer for FakeChart {
        fn render(&self, _data: &serde_json::Value, _chart_type: Option<&str>, _title: Option<&str>) -> anyhow::Result<String> {
            Ok("chart".to_string())
        }
    }

    struct FakeTable;
    impl TableRenderer for FakeTable {
        fn render(&self, _data: &serde_json::Value, _title: Option<&str>) -> anyhow::Result<String> {
            Ok("table".to_string())
        }
    }

    fn data_args() -> Map<String, serde_json::Value> {
        let serde_json::Value::Object(map) = json!({"data": [1, 2, 3]}) else { unreachable!() };
        map
    }

    #[tokio::test]
    async fn render_chart_always_displayed() {
        let handler = RenderChartHandler { renderer: Arc::new(FakeChart) };
        let result = handler.call(&data_args(), &CancelToken::new()).await.unwrap();
        assert!(result.displayed());
    }

    #[tokio::test]
    async fn render_table_always_displayed() {
        let handler = RenderTableHandler { renderer: Arc::new(FakeTable) };
        let result = handler.call(&data_args(), &CancelToken::new()).await.unwrap();
        assert!(result.displayed());
    }
}
