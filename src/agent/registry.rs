//! Tool registry: the ordered set of tools offered to the model.

use super::tools::{parse_tool_call, ToolContext, ToolError, ToolKind, ToolResult};
use serde_json::Value;
use tracing::warn;

/// Registry of tools the agent exposes to the model.
///
/// Registration order is preserved and is the order tool definitions are
/// sent in. Re-registering a name replaces the earlier entry in place.
pub struct ToolRegistry {
    tools: Vec<ToolKind>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry with every built-in tool registered.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for kind in ToolKind::ALL {
            registry.register(kind);
        }
        registry
    }

    /// Register a tool. If a tool with the same wire name is already
    /// registered, it is replaced at its original position.
    pub fn register(&mut self, kind: ToolKind) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name() == kind.name()) {
            warn!("Tool '{}' already registered, replacing", kind.name());
            *existing = kind;
            return;
        }
        self.tools.push(kind);
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by its wire name.
    pub fn resolve(&self, name: &str) -> Option<ToolKind> {
        self.tools.iter().copied().find(|t| t.name() == name)
    }

    /// Tool specifications in registration order, for the model request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name(),
                description: t.description(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Dispatch a model-requested tool call.
    ///
    /// Every failure mode (unknown tool, invalid arguments, store fault)
    /// comes back as a structured `ToolResult::Error` the model can read
    /// and recover from; nothing escapes as an `Err`.
    pub async fn invoke(
        &self,
        context: &ToolContext,
        owner: &str,
        name: &str,
        args: &Value,
    ) -> ToolResult {
        let Some(kind) = self.resolve(name) else {
            return ToolResult::Error(ToolError::not_found(format!("Unknown tool: {}", name)));
        };

        match parse_tool_call(kind, args) {
            Ok(call) => context.execute(&call, owner).await,
            Err(e) => ToolResult::Error(e),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtin_tools()
    }
}

/// A tool specification handed to the model.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_builtin_registration_order() {
        let registry = ToolRegistry::with_builtin_tools();
        let names: Vec<&str> = registry.definitions().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "add_task",
                "list_tasks",
                "get_task",
                "update_task",
                "complete_task",
                "delete_task",
            ]
        );
    }

    #[test]
    fn test_reregister_keeps_position() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolKind::AddTask);
        registry.register(ToolKind::ListTasks);
        registry.register(ToolKind::AddTask);

        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.definitions().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["add_task", "list_tasks"]);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::with_builtin_tools();
        let context = ToolContext::new(Arc::new(MemoryStore::new()));

        let result = registry
            .invoke(&context, "alice", "launch_rocket", &json!({}))
            .await;
        let payload = result.to_value();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_invoke_bad_arguments_is_validation_error() {
        let registry = ToolRegistry::with_builtin_tools();
        let context = ToolContext::new(Arc::new(MemoryStore::new()));

        let result = registry
            .invoke(&context, "alice", "add_task", &json!({"title": ""}))
            .await;
        let payload = result.to_value();
        assert_eq!(payload["error"]["type"], "validation_error");
    }
}
