//! Supervision layer for tool-calling language-model agents.
//!
//! A [`StepSupervisor`] drives the model/tool loop for one query. Before any
//! tool executes, the [`LoopDetector`] decides whether the call repeats an
//! earlier one (exactly or approximately) and, if so, the call is answered
//! with a synthetic "LOOP DETECTED" message instead. Every iteration lands on
//! a [`Trace`] kept by the [`Tracer`], with token, cost and timing totals.
//!
//! On top of the single-agent loop, the [`MultiAgentOrchestrator`] runs a
//! research, analysis, writing and review pipeline across three specialist
//! roles, each call being its own supervised run.
//!
//! # Modules
//!
//! - [`agent`]: the step supervisor
//! - [`loop_detection`]: exact, fuzzy and stagnation checks plus word-set similarity
//! - [`tracing`] and [`trace`]: the execution tracer and its record types
//! - [`orchestrator`]: the multi-agent pipeline
//! - [`llm`] and [`tools`]: model and tool collaborators
//! - [`config`]: YAML configuration

pub mod agent;
pub mod config;
pub mod core_types;
pub mod errors;
pub mod llm;
pub mod loop_detection;
pub mod orchestrator;
pub mod tools;
pub mod trace;
pub mod tracing;

pub use agent::{AgentConfig, RunOutcome, RunStatus, StepSupervisor};
pub use config::*;
pub use core_types::{LLMResponse, Message, ToolCall, Usage};
pub use errors::{AgentError, TracerError};
pub use llm::{HttpLLMClient, ToolMetadata, LLM};
pub use loop_detection::{LoopDetectionConfig, LoopDetectionResult, LoopDetector, LoopStrategy};
pub use orchestrator::{MultiAgentOrchestrator, OrchestrationReport};
pub use tools::{Tool, ToolRegistry};
pub use trace::{AgentStep, ToolCallRecord, Trace, TraceStatus};
pub use tracing::Tracer;

#[cfg(test)]
pub mod test_utils;
