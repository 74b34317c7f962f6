//! Conversation message types stored in the `messages` state field.
//!
//! Roles: System, User, Assistant (optionally carrying tool-call requests),
//! Tool (the result of one tool call, keyed by its call id). Messages serialize
//! with serde so they can live inside [`StateValues`](crate::state::StateValues)
//! as plain JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation request, produced by the decision node and consumed
/// exactly once by the tool-dispatch node.
///
/// `id` is the unique call identifier; the matching [`Message::Tool`] result
/// carries the same id so observers can link request and result.
///
/// **Interaction**: Embedded in `Message::Assistant::tool_calls`; read by
/// `ToolDispatchNode` to call the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call identifier (e.g. "call-1").
    pub id: String,
    /// Tool name as registered in the tool registry.
    pub name: String,
    /// Arguments as a JSON value; tools parse the shape they expect.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a tool call request.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A single message in the conversation.
///
/// The `Tool` variant is the result-message for one tool call; `is_error`
/// marks results synthesized from a failed call (tool not found, domain error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System {
        content: String,
    },
    /// User input.
    User {
        content: String,
    },
    /// Model reply; may carry tool-call requests for the next step.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool call, linked to its request by `call_id`.
    Tool {
        call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Creates an assistant message with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// Creates an assistant message carrying tool-call requests.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Creates a successful tool result-message.
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error tool result-message (tool not found, domain error).
    pub fn tool_error(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Returns the message content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }

    /// Serializes into a JSON value for storage in a state field.
    ///
    /// Message serialization cannot fail (string-keyed, no custom serializers);
    /// a defensive `Value::Null` is returned if it ever did.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Deserializes a message from a state-field JSON value.
    ///
    /// Returns `None` for values that are not message-shaped; callers skip
    /// those rather than failing the run.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Decodes every message-shaped entry of a JSON array, skipping others.
pub fn messages_from_values(values: &[Value]) -> Vec<Message> {
    values.iter().filter_map(Message::from_value).collect()
}
