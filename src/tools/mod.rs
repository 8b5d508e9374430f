//! Tool Registry Contracts
//!
//! The agent loop consumes tools through these traits; the tool
//! implementations themselves live with the caller (the CLI wires a small
//! default set, tests register stubs). A registry exposes named tools with a
//! JSON Schema parameter declaration and an `execute` contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use crate::llm::ToolSchema;

/// Result of one tool execution. A failed execution is still a result: the
/// error text is surfaced to the model so the loop can continue.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    /// Displayable content appended to the transcript
    pub content: String,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: format!("Error: {}", message.into()),
        }
    }
}

/// A named, schema-described capability the agent may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object
    fn parameters(&self) -> Value;

    /// Execute with the given arguments. Implementations should observe
    /// `cancel` for long-running work; the loop aborts only the current call.
    async fn execute(&self, args: Value, cancel: &CancellationToken) -> ToolOutput;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Catalog of named tools, consulted once per tool call
pub trait ToolRegistry: Send + Sync {
    /// Declarations for every registered tool, sent with each chat request
    fn list_tools(&self) -> Vec<ToolSchema>;

    /// Resolve a tool by name; `None` for unknown names (the loop turns
    /// this into a textual "tool not found" result, never a panic)
    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;
}

/// Registry over a fixed set of tools, keyed by name
#[derive(Default)]
pub struct StaticRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for StaticRegistry {
    fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value, _cancel: &CancellationToken) -> ToolOutput {
            match args["text"].as_str() {
                Some(text) => ToolOutput::ok(text),
                None => ToolOutput::error("missing 'text' argument"),
            }
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = StaticRegistry::new().with_tool(Arc::new(EchoTool));
        assert!(registry.get_tool("echo").is_some());
        assert!(registry.get_tool("missing").is_none());
    }

    #[test]
    fn test_registry_lists_schemas() {
        let registry = StaticRegistry::new().with_tool(Arc::new(EchoTool));
        let schemas = registry.list_tools();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "echo");
        assert!(schemas[0].parameters["properties"]["text"].is_object());
    }

    #[tokio::test]
    async fn test_echo_execution() {
        let tool = EchoTool;
        let cancel = CancellationToken::new();

        let out = tool.execute(json!({"text": "hi"}), &cancel).await;
        assert!(out.success);
        assert_eq!(out.content, "hi");

        let err = tool.execute(json!({}), &cancel).await;
        assert!(!err.success);
        assert!(err.content.starts_with("Error:"));
    }
}
