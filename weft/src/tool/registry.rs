//! Tool registry: name → callable, plus a closure adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolCallContext, ToolError, ToolOutput, ToolSpec};

/// Central registry mapping tool names to callables.
///
/// Built before the run starts and shared read-only afterwards. Registering
/// a name twice replaces the earlier tool.
///
/// **Interaction**: Consumed by `ToolDispatchNode` (lookup + call) and by
/// agent builders (`list` feeds the model's tool specs).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Looks a tool up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Lists registered tool specs, sorted by name for determinism.
    pub fn list(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|tool| tool.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

type FnToolHandler =
    Arc<dyn Fn(Value, &ToolCallContext) -> Result<ToolOutput, ToolError> + Send + Sync>;

/// Adapter turning a closure into a [`Tool`].
///
/// The handler is synchronous; tools that need to await I/O implement
/// [`Tool`] directly.
pub struct FnTool {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: FnToolHandler,
}

impl FnTool {
    /// Creates a tool from a name and a handler closure.
    pub fn new(
        name: impl Into<String>,
        handler: impl Fn(Value, &ToolCallContext) -> Result<ToolOutput, ToolError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({ "type": "object" }),
            handler: Arc::new(handler),
        }
    }

    /// Sets the description shown to the model.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the argument JSON Schema.
    pub fn with_input_schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    async fn call(&self, arguments: Value, ctx: &ToolCallContext) -> Result<ToolOutput, ToolError> {
        (self.handler)(arguments, ctx)
    }
}
