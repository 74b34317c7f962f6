//! Scripted model for tests and examples.
//!
//! Returns queued responses in order and records every prompt it was given,
//! so tests can assert exactly what the decision node saw at each step.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatModel, ModelError, ModelResponse};
use crate::message::Message;
use crate::tool::ToolSpec;

/// Model double: pops one queued [`ModelResponse`] per call.
///
/// An exhausted script fails the call, which keeps tests strict about how
/// many decision steps a run takes.
///
/// **Interaction**: Implements [`ChatModel`]; used by `ModelNode` in tests
/// and examples.
pub struct ScriptedModel {
    responses: Mutex<Vec<ModelResponse>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    /// Creates a scripted model that replays `responses` in order.
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(vec![]),
        }
    }

    /// Every prompt the model has been invoked with, in call order.
    pub fn recorded_prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<ModelResponse, ModelError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(messages.to_vec());
        self.responses
            .lock()
            .expect("responses lock")
            .pop()
            .ok_or_else(|| ModelError::Call("script exhausted".to_string()))
    }
}
