//! Tool and Toolkit traits: the abstraction over agent capabilities.
//!
//! A [`Toolkit`] is what the agent loop talks to: it advertises schemas and
//! executes invocation requests. [`ToolRegistry`] is the stock toolkit,
//! built from individual [`Tool`] implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ToolError;
use crate::message::{ContentBlock, ToolUse};
use crate::model::ToolDefinition;

/// What a tool hands back to the agent loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// The output content
    pub content: Vec<ContentBlock>,
}

impl ToolResponse {
    /// A response holding a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// Advertises callable tools and executes invocations.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Tool definitions, in a stable order.
    fn schemas(&self) -> Vec<ToolDefinition>;

    /// Execute one invocation request.
    async fn call(&self, request: &ToolUse) -> std::result::Result<ToolResponse, ToolError>;
}

/// A single named capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "bash", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        input: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<ToolResponse, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, kept in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolkit for ToolRegistry {
    fn schemas(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    async fn call(&self, request: &ToolUse) -> std::result::Result<ToolResponse, ToolError> {
        let tool = self
            .get(&request.name)
            .ok_or_else(|| ToolError::NotFound(request.name.clone()))?;
        tool.execute(&request.input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            input: &serde_json::Map<String, serde_json::Value>,
        ) -> std::result::Result<ToolResponse, ToolError> {
            let text = input
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".into()))?;
            Ok(ToolResponse::text(text))
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str { self.0 }
        fn description(&self) -> &str { "noop" }
        fn parameters_schema(&self) -> serde_json::Value { serde_json::json!({"type": "object"}) }
        async fn execute(
            &self,
            _input: &serde_json::Map<String, serde_json::Value>,
        ) -> std::result::Result<ToolResponse, ToolError> {
            Ok(ToolResponse::default())
        }
    }

    fn tool_use(name: &str, input: serde_json::Value) -> ToolUse {
        ToolUse {
            id: "call_1".into(),
            name: name.into(),
            input: input.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn schemas_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("write_file")));
        registry.register(Box::new(NamedTool("bash")));
        registry.register(Box::new(NamedTool("read_file")));
        registry.register(Box::new(NamedTool("bash")));

        let names: Vec<_> = registry.schemas().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["write_file", "bash", "read_file"]);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn registry_executes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let response = registry
            .call(&tool_use("echo", serde_json::json!({"text": "hello world"})))
            .await
            .unwrap();
        assert_eq!(response, ToolResponse::text("hello world"));
    }

    #[tokio::test]
    async fn registry_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .call(&tool_use("nonexistent", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn tool_argument_errors_surface() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry
            .call(&tool_use("echo", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
