//! Tool Registry — spec.md §4.1.
//!
//! Mirrors the grounding repo's `ToolRegistry` (`Vec<Box<dyn Tool>>` plus a
//! linear `find`, "first registered wins" on name collision), generalized
//! so each entry carries both the catalog [`ToolDefinition`] and the
//! handler that executes it.

use std::sync::Arc;

use aiq_core::{CancelToken, ToolDefinition, ToolResult};
use async_trait::async_trait;

/// Whether `execute_sql` is offered this turn (spec.md §4.1: "in database
/// mode, `execute_sql` is included; in free mode it is omitted").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Database,
    Free,
}

/// Executes one tool call's parsed arguments into a [`ToolResult`].
///
/// Implementations live in `aiq-exec`, which wires in the injected
/// `DbExecutor`/`ChartRenderer`/`TableRenderer`/sandbox root the handlers
/// need; this trait is only the seam the registry stores.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
        cancel: &CancelToken,
    ) -> anyhow::Result<ToolResult>;
}

#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<(ToolDefinition, Arc<dyn ToolHandler>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        tracing::debug!(tool = %definition.name, risk_level = ?definition.risk_level, "tool registered");
        self.entries.push((definition, handler));
    }

    /// The catalog for this turn, filtered by mode. `execute_sql` is the
    /// only built-in gated on mode (spec.md §4.1).
    pub fn definitions(&self, mode: Mode) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .map(|(definition, _)| definition.clone())
            .filter(|definition| mode == Mode::Database || definition.name != "execute_sql")
            .collect()
    }

    /// First-registered-wins lookup, matching the grounding repo's
    /// `Vec` + `find` semantics on duplicate names.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.entries
            .iter()
            .find(|(definition, _)| definition.name == name)
            .map(|(_, handler)| Arc::clone(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiq_core::{RiskLevel, ToolParam};
    use serde_json::Map;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, _args: &Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(serde_json::json!({"ok": true}), false))
        }
    }

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: "test".to_string(),
            params: vec![ToolParam::required("x", "x")],
            risk_level: Some(RiskLevel::Low),
        }
    }

    #[test]
    fn empty_registry_has_no_definitions() {
        let registry = ToolRegistry::new();
        assert!(registry.definitions(Mode::Database).is_empty());
        assert!(registry.lookup("anything").is_none());
    }

    #[test]
    fn free_mode_excludes_execute_sql() {
        let mut registry = ToolRegistry::new();
        registry.register(def("execute_sql"), Arc::new(EchoHandler));
        registry.register(def("execute_command"), Arc::new(EchoHandler));

        assert_eq!(registry.definitions(Mode::Database).len(), 2);
        let free = registry.definitions(Mode::Free);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].name, "execute_command");
    }

    #[test]
    fn duplicate_name_lookup_returns_first_registered() {
        let mut registry = ToolRegistry::new();
        registry.register(def("dup"), Arc::new(EchoHandler));
        registry.register(def("dup"), Arc::new(EchoHandler));

        assert_eq!(registry.definitions(Mode::Database).iter().filter(|d| d.name == "dup").count(), 2);
        assert!(registry.lookup("dup").is_some());
    }

    #[tokio::test]
    async fn lookup_result_is_callable() {
        let mut registry = ToolRegistry::new();
        registry.register(def("execute_command"), Arc::new(EchoHandler));
        let handler = registry.lookup("execute_command").unwrap();
        let result = handler.call(&Map::new(), &CancelToken::new()).await.unwrap();
        assert!(!result.is_error());
    }
}
