//! Model collaborator: the decision-making node and its trait.
//!
//! The model is an external collaborator behind [`ChatModel`]: given a
//! message list and the available tool specs, it returns a reply and zero or
//! more tool-call requests. [`ModelNode`] wraps it as a graph node: it
//! appends the assistant message to state and routes to the dispatch node
//! when the reply requests tools, or terminates the run otherwise.

mod mock;

pub use mock::ScriptedModel;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::command::Command;
use crate::error::GraphError;
use crate::graph::{Node, StepContext};
use crate::message::{messages_from_values, Message, ToolCall};
use crate::state::{StateValues, MESSAGES_KEY};
use crate::tool::{ToolSpec, TOOL_DISPATCH_NODE};

/// Default id of the decision node in a graph.
pub const MODEL_NODE: &str = "model";

/// One model reply: text plus requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// Assistant text.
    pub content: String,
    /// Tool-call requests for the next step; empty means a final answer.
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    /// A final text answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// A reply requesting tool calls.
    pub fn with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }
}

/// Error from the model collaborator.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The call failed (transport, contract, exhausted script, ...).
    #[error("model call failed: {0}")]
    Call(String),
}

/// Decision collaborator: opaque blocking call behind an async trait.
///
/// **Interaction**: Implemented by real clients outside this crate and by
/// [`ScriptedModel`] for tests; consumed by [`ModelNode`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produces the next reply for the given prompt and available tools.
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelResponse, ModelError>;
}

/// Graph node wrapping a [`ChatModel`].
///
/// The prompt is the node's dynamic input when one is declared (recomputed
/// from post-merge state before each execution), otherwise the messages
/// field as-is. The reply is appended to the messages field; routing goes to
/// the dispatch node when tool calls were requested and terminates the run
/// otherwise.
pub struct ModelNode {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
    dispatch_node: String,
    messages_key: String,
}

impl ModelNode {
    /// Creates a decision node over the given model and tool specs.
    pub fn new(model: Arc<dyn ChatModel>, tools: Vec<ToolSpec>) -> Self {
        Self {
            model,
            tools,
            dispatch_node: TOOL_DISPATCH_NODE.to_string(),
            messages_key: MESSAGES_KEY.to_string(),
        }
    }

    /// Overrides the node routed to when the reply requests tools.
    pub fn with_dispatch_node(mut self, node: impl Into<String>) -> Self {
        self.dispatch_node = node.into();
        self
    }

    /// Overrides the messages state field (default [`MESSAGES_KEY`]).
    pub fn with_messages_key(mut self, key: impl Into<String>) -> Self {
        self.messages_key = key.into();
        self
    }

    fn prompt(&self, state: &StateValues, ctx: &StepContext<'_>) -> Result<Vec<Message>, GraphError> {
        match ctx.derived_input() {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                GraphError::node_failed(
                    MODEL_NODE,
                    format!("dynamic input is not a message list: {e}"),
                )
            }),
            None => Ok(match state.get(&self.messages_key) {
                Some(Value::Array(values)) => messages_from_values(values),
                _ => vec![],
            }),
        }
    }
}

#[async_trait]
impl Node for ModelNode {
    fn id(&self) -> &str {
        MODEL_NODE
    }

    async fn run(
        &self,
        state: &StateValues,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError> {
        let prompt = self.prompt(state, ctx)?;
        let response = self
            .model
            .invoke(&prompt, &self.tools)
            .await
            .map_err(|e| GraphError::node_failed(MODEL_NODE, e))?;

        let has_calls = !response.tool_calls.is_empty();
        let message = Message::assistant_with_calls(response.content, response.tool_calls);
        let command = Command::new().with_update(
            self.messages_key.clone(),
            Value::Array(vec![message.to_value()]),
        );
        let command = if has_calls {
            command.with_goto(self.dispatch_node.clone())
        } else {
            command.end()
        };
        Ok(vec![command])
    }
}
