//! In-memory stand-ins for the collaborators spec.md §1 puts out of scope
//! (concrete DB drivers, chart/table renderers). They exist so `aiq` runs
//! end-to-end without a real database; swap them for a MySQL/Postgres/
//! SeekDB driver and a real renderer to get a production host.

use std::sync::Mutex;

use aiq_core::{ChartRenderer, DbExecutor, QueryResult, TableRenderer};
use async_trait::async_trait;
use serde_json::Value;

/// A single in-memory table, `orders`, so a fresh install has something to
/// query.
pub struct DemoDb {
    rows: Mutex<Vec<(i64, String, f64)>>,
}

impl Default for DemoDb {
    fn default() -> Self {
        Self {
            rows: Mutex::new(vec![
                (1, "widget".into(), 19.99),
                (2, "gadget".into(), 34.50),
                (3, "gizmo".into(), 9.25),
            ]),
        }
    }
}

#[async_trait]
impl DbExecutor for DemoDb {
    async fn execute(&self, sql: &str) -> anyhow::Result<QueryResult> {
        let lowered = sql.to_ascii_lowercase();
        if lowered.starts_with("show tables") {
            return Ok(QueryResult {
                columns: vec!["table_name".into()],
                rows: vec![vec![Value::String("orders".into())]],
            });
        }

        if lowered.contains("drop table") {
            anyhow::bail!("demo db is read-only: refusing to drop a table");
        }

        let rows = self.rows.lock().unwrap();
        Ok(QueryResult {
            columns: vec!["id".into(), "name".into(), "price".into()],
            rows: rows
                .iter()
                .map(|(id, name, price)| {
                    vec![Value::from(*id), Value::String(name.clone()), Value::from(*price)]
                })
                .collect(),
        })
    }
}

pub struct DemoChartRenderer;

impl ChartRenderer for DemoChartRenderer {
    fn render(&self, data: &Value, chart_type: Option<&str>, title: Option<&str>) -> anyhow::Result<String> {
        let kind = chart_type.unwrap_or("bar");
        let heading = title.unwrap_or("chart");
        Ok(format!("[{kind} chart: {heading}]\n{data}"))
    }
}

pub struct DemoTableRenderer;

impl TableRenderer for DemoTableRenderer {
    fn render(&self, data: &Value, title: Option<&str>) -> anyhow::Result<String> {
        let heading = title.unwrap_or("table");
        Ok(format!("[{heading}]\n{data}"))
    }
}
