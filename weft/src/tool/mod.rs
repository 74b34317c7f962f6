//! Tool abstraction: registry of named callables plus the dispatch node.
//!
//! A tool takes JSON arguments and a per-call context (call id, run
//! configuration) and returns either a plain value, wrapped into a default
//! Command appending one result-message, or an explicit [`Command`] used
//! verbatim. Tool-level errors are contained: they become error
//! result-messages, never run failures.

mod dispatch;
mod registry;

pub use dispatch::{ToolDispatchNode, TOOL_DISPATCH_NODE};
pub use registry::{FnTool, ToolRegistry};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::command::Command;
use crate::config::RunConfig;

/// Tool metadata handed to the decision model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    /// Tool name as used in tool-call requests.
    pub name: String,
    /// Human-readable description for the model.
    pub description: Option<String>,
    /// JSON Schema for arguments.
    pub input_schema: Value,
}

/// Error from one tool call. Contained by the dispatch node: converted into
/// an error result-message for the call, leaving sibling calls unaffected.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool registered under the requested name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Arguments did not match what the tool expects.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The run configuration lacks a key the tool requires.
    #[error("missing configuration key '{0}'")]
    MissingConfig(String),
    /// Domain error raised by the tool itself.
    #[error("{0}")]
    Execution(String),
}

/// What a tool call produced.
///
/// A plain `Value` is wrapped into a default Command appending one
/// result-message keyed by the call id; an explicit `Command` is used as-is
/// (the dispatcher still guarantees a result-message linked to the call id).
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// Plain result; becomes the content of the synthesized result-message.
    Value(Value),
    /// Explicit state update and/or routing directive.
    Command(Command),
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Command> for ToolOutput {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Value(Value::String(text))
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Value(Value::String(text.to_string()))
    }
}

/// Context injected into every tool call.
///
/// Carries the unique call identifier and the run configuration (an opaque
/// bag the executor never mutates). Tools stay referentially transparent:
/// everything they may read arrives through this value or their arguments.
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    /// Unique identifier of this call; result-messages carry it.
    pub call_id: String,
    /// Name the tool was invoked under.
    pub tool_name: String,
    /// Configuration of the enclosing run.
    pub config: RunConfig,
}

impl ToolCallContext {
    /// Reads a required configuration key.
    ///
    /// A missing key is a [`ToolError::MissingConfig`], which the dispatch
    /// node reports as an error result-message, not a framework failure.
    pub fn require_config(&self, key: &str) -> Result<&Value, ToolError> {
        self.config
            .get(key)
            .ok_or_else(|| ToolError::MissingConfig(key.to_string()))
    }
}

/// A named callable: arguments + call context in, [`ToolOutput`] out.
///
/// **Interaction**: Registered in [`ToolRegistry`]; invoked by
/// [`ToolDispatchNode`] once per tool-call request.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the tool is registered and invoked under.
    fn name(&self) -> &str;

    /// Metadata for the decision model. Defaults to a bare object schema.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: None,
            input_schema: serde_json::json!({ "type": "object" }),
        }
    }

    /// Executes one call.
    async fn call(&self, arguments: Value, ctx: &ToolCallContext) -> Result<ToolOutput, ToolError>;
}
