//! Mock model collaborators for unit tests

pub mod mock_llm_server;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core_types::{LLMResponse, Message, ToolCall};
use crate::errors::AgentError;
use crate::llm::{ToolMetadata, LLM};

/// Replays a fixed queue of responses and records every request.
pub struct ScriptedLLM {
    responses: Mutex<VecDeque<Result<LLMResponse, AgentError>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    tool_lists: Arc<Mutex<Vec<Option<Vec<ToolMetadata>>>>>,
    model: String,
}

impl ScriptedLLM {
    pub fn new(responses: Vec<Result<LLMResponse, AgentError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            tool_lists: Arc::new(Mutex::new(Vec::new())),
            model: "scripted-model".to_string(),
        }
    }

    pub fn with_responses(responses: Vec<LLMResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tool_lists(&self) -> Vec<Option<Vec<ToolMetadata>>> {
        self.tool_lists.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        self.requests.lock().unwrap().push(messages);
        self.tool_lists.lock().unwrap().push(tools);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::ModelCall("scripted responses exhausted".to_string())))
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

type Responder = dyn Fn(&[Message], usize) -> Result<LLMResponse, AgentError> + Send + Sync;

/// Computes each response from the transcript and the zero-based call index.
pub struct ClosureLLM {
    responder: Box<Responder>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ClosureLLM {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message], usize) -> Result<LLMResponse, AgentError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLM for ClosureLLM {
    async fn generate(
        &self,
        messages: Vec<Message>,
        _tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(messages.clone());
            calls.len() - 1
        };
        (self.responder)(&messages, index)
    }

    fn model_name(&self) -> String {
        "closure-model".to_string()
    }
}

/// Shorthand for a response requesting a single tool call.
pub fn tool_call_response(id: &str, name: &str, arguments: &str) -> LLMResponse {
    LLMResponse::with_tool_calls(None, vec![ToolCall::new(id, name, arguments)]).with_usage(50, 10)
}

/// Shorthand for a final text answer.
pub fn answer_response(content: &str) -> LLMResponse {
    LLMResponse::text(content).with_usage(80, 20)
}

/// Text of the most recent user entry in a transcript.
pub fn last_user_message(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find_map(|message| match message {
            Message::User { content } => Some(content.as_str()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Text of the system entry in a transcript.
pub fn system_prompt(messages: &[Message]) -> &str {
    messages
        .iter()
        .find_map(|message| match message {
            Message::System { content } => Some(content.as_str()),
            _ => None,
        })
        .unwrap_or_default()
}
