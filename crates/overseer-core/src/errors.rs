//! Error types for supervised agent execution
//!
//! Errors are grouped by their source so callers can decide what is fatal.
//! Only model-call failures end a run early; tool failures are folded back
//! into the transcript and loops are reported as supervisory signals rather
//! than errors. Tracer misuse is reported through [`TracerError`], which names
//! the exact precondition that was violated.

use thiserror::Error;

use crate::trace::TraceStatus;

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    ModelCall(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Tracer error: {0}")]
    Tracer(#[from] TracerError),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::ModelCall(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ParsingError(err.to_string())
    }
}

/// Misuse of the [`Tracer`](crate::tracing::Tracer) API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TracerError {
    #[error("unknown trace '{0}'")]
    UnknownTrace(String),
    #[error("trace '{trace_id}' is already terminal ({status})")]
    AlreadyTerminal { trace_id: String, status: TraceStatus },
    #[error("'{0}' is not a terminal status")]
    InvalidStatus(TraceStatus),
    #[error("failed to serialize trace '{trace_id}': {message}")]
    Serialization { trace_id: String, message: String },
}
