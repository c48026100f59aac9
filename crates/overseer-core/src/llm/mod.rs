//! Language model abstraction and the HTTP client used in production.
//!
//! The supervisor only ever talks to a model through the [`LLM`] trait, so
//! tests substitute scripted implementations and the binary plugs in
//! [`HttpLLMClient`].
//!
//! The HTTP client speaks a flat proxy wire shape rather than the OpenAI
//! envelope: tools are sent as `{name, description, input_schema}` and the
//! response body is decoded directly as an [`LLMResponse`]
//! (`{content, tool_calls, finish_reason, usage}`), not as `choices[0].message`.
//! Point it at a gateway that translates to the provider API.

pub use crate::core_types::{LLMResponse, Message};
use crate::config::types::LlmConfig;
use crate::errors::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError>;

    /// Model identifier recorded on every trace.
    fn model_name(&self) -> String;
}

pub struct HttpLLMClient {
    pub endpoint_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpLLMClient {
    pub fn new(endpoint_url: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint_url: String = endpoint_url.into();
        Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.endpoint_url.clone(), config.model.clone()).with_api_key(config.api_key.clone())
    }
}

#[async_trait]
impl LLM for HttpLLMClient {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        #[derive(Serialize)]
        struct RequestPayload<'a> {
            model: &'a str,
            messages: &'a [Message],
            #[serde(skip_serializing_if = "Option::is_none")]
            tools: Option<&'a [ToolMetadata]>,
        }

        let payload = RequestPayload {
            model: &self.model,
            messages: &messages,
            tools: tools.as_deref(),
        };

        let request_url = format!("{}/v1/chat/completions", self.endpoint_url);
        log::debug!(
            "HttpLLMClient sending {} messages to {} (model {})",
            messages.len(),
            request_url,
            self.model
        );

        let mut request = self.client.post(&request_url).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            let err_msg = format!("HTTP request to LLM endpoint failed: {}", e);
            log::error!("{}", err_msg);
            AgentError::ModelCall(err_msg)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error while reading error response body".to_string());
            let err_msg = format!("LLM API request failed with status {}: {}", status, error_text);
            log::error!("{}", err_msg);
            return Err(AgentError::ModelCall(err_msg));
        }

        let llm_response = response.json::<LLMResponse>().await.map_err(|e| {
            let err_msg = format!("Failed to parse LLM response JSON: {}", e);
            log::error!("{}", err_msg);
            AgentError::ModelCall(err_msg)
        })?;

        log::debug!(
            "HttpLLMClient received content: {:?}, {} tool calls",
            llm_response.content,
            llm_response.tool_calls.len()
        );

        Ok(llm_response)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
