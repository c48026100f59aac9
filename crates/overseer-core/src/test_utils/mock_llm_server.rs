// src/test_utils/mock_llm_server.rs
use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::core_types::{LLMResponse, Message};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MockLLMRequestPayload {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Option<Vec<ToolMetadata>>,
}

/// A request as seen by the mock server, including the auth header.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolMetadata>>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct MockServerState {
    responses: Arc<Mutex<VecDeque<Result<LLMResponse, AgentError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn chat_completions_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(payload): Json<MockLLMRequestPayload>,
) -> Result<Json<LLMResponse>, StatusCode> {
    log::debug!("Mock LLM server received {} messages", payload.messages.len());

    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    state.requests.lock().unwrap().push(RecordedRequest {
        model: payload.model,
        messages: payload.messages,
        tools: payload.tools,
        authorization,
    });

    match state.responses.lock().unwrap().pop_front() {
        Some(Ok(resp)) => Ok(Json(resp)),
        Some(Err(e)) => {
            log::debug!("Mock LLM server simulating an error: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        None => {
            log::error!("Mock LLM server ran out of responses");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Minimal OpenAI-style endpoint serving a scripted queue of responses.
pub struct MockLLMServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockLLMServer {
    pub async fn start(responses: Vec<Result<LLMResponse, AgentError>>) -> Self {
        let state = MockServerState {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock LLM server");
        let addr = listener.local_addr().expect("mock LLM server address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = served {
                log::error!("Mock LLM server error: {}", e);
            }
        });

        MockLLMServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        tokio::task::yield_now().await;
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }
}
