// src/trace.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version of the trace JSON layout. Bump when fields change shape.
pub const TRACE_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Running,
    Completed,
    Failed,
    LoopDetected,
}

impl TraceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TraceStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Running => "running",
            TraceStatus::Completed => "completed",
            TraceStatus::Failed => "failed",
            TraceStatus::LoopDetected => "loop_detected",
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single executed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_output: String,
    pub duration_ms: f64,
}

impl ToolCallRecord {
    pub fn new(tool_name: impl Into<String>, tool_input: Value, tool_output: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input,
            tool_output: tool_output.into(),
            duration_ms: duration_ms.max(0.0),
        }
    }
}

/// One iteration of the agent loop: a model call plus the tools it triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: usize,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub duration_ms: f64,
    /// Unix timestamp in seconds
    pub timestamp: f64,
}

impl AgentStep {
    pub fn new(step_number: usize) -> Self {
        let now = chrono::Utc::now();
        Self {
            step_number,
            reasoning: None,
            tool_calls: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            duration_ms: 0.0,
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
        }
    }

    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd.max(0.0);
        self
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms.max(0.0);
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|call| call.tool_name.as_str()).collect()
    }
}

/// Complete record of one agent run.
///
/// Totals are only ever changed together with `steps`, so they always equal
/// the sum over the recorded steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub schema_version: String,
    pub trace_id: String,
    pub agent_name: String,
    pub input_query: String,
    pub model: String,
    pub steps: Vec<AgentStep>,
    pub final_output: Option<String>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    pub total_duration_ms: f64,
    pub status: TraceStatus,
    pub error: Option<String>,
}

impl Trace {
    pub(crate) fn new(trace_id: String, agent_name: &str, input_query: &str, model: &str) -> Self {
        Self {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            trace_id,
            agent_name: agent_name.to_string(),
            input_query: input_query.to_string(),
            model: model.to_string(),
            steps: Vec::new(),
            final_output: None,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cost_usd: 0.0,
            total_duration_ms: 0.0,
            status: TraceStatus::Running,
            error: None,
        }
    }

    pub(crate) fn push_step(&mut self, step: AgentStep) {
        self.total_input_tokens += step.input_tokens;
        self.total_output_tokens += step.output_tokens;
        self.total_cost_usd += step.cost_usd;
        self.total_duration_ms += step.duration_ms;
        self.steps.push(step);
    }

    pub fn tool_call_count(&self) -> usize {
        self.steps.iter().map(|step| step.tool_calls.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminality() {
        assert!(!TraceStatus::Running.is_terminal());
        assert!(TraceStatus::Completed.is_terminal());
        assert!(TraceStatus::Failed.is_terminal());
        assert!(TraceStatus::LoopDetected.is_terminal());
    }

    #[test]
    fn test_status_serialization_matches_display() {
        for status in [
            TraceStatus::Running,
            TraceStatus::Completed,
            TraceStatus::Failed,
            TraceStatus::LoopDetected,
        ] {
            let encoded = serde_json::to_value(status).unwrap();
            assert_eq!(encoded, json!(status.to_string()));
        }
    }

    #[test]
    fn test_push_step_accumulates_totals() {
        let mut trace = Trace::new("abcd1234".to_string(), "agent", "query", "model");
        trace.push_step(AgentStep::new(1).with_tokens(10, 5).with_cost(0.01).with_duration(12.5));
        trace.push_step(
            AgentStep::new(2)
                .with_tokens(20, 7)
                .with_cost(0.02)
                .with_duration(7.5)
                .with_tool_calls(vec![ToolCallRecord::new("search", json!({"query": "x"}), "ok", 1.0)]),
        );

        assert_eq!(trace.total_input_tokens, 30);
        assert_eq!(trace.total_output_tokens, 12);
        assert!((trace.total_cost_usd - 0.03).abs() < 1e-12);
        assert_eq!(trace.total_duration_ms, 20.0);
        assert_eq!(trace.tool_call_count(), 1);
        assert_eq!(trace.steps[1].tool_names(), vec!["search"]);
    }

    #[test]
    fn test_negative_measurements_are_clamped() {
        let step = AgentStep::new(1).with_cost(-1.0).with_duration(-3.0);
        assert_eq!(step.cost_usd, 0.0);
        assert_eq!(step.duration_ms, 0.0);
        assert!(step.timestamp > 0.0);
    }
}
