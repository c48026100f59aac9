//! Execution tracing for supervised agent runs
//!
//! A [`Tracer`] owns a table of traces keyed by a short id. Each trace is an
//! append-only record of steps with running totals, and moves exactly once
//! from `running` to a terminal status. Finished traces can be exported as
//! pretty JSON, summarised for humans, or appended to a JSON-lines file.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::config::types::TracingConfig;
use crate::errors::TracerError;
use crate::trace::{AgentStep, Trace, TraceStatus};

const TRACE_ID_LEN: usize = 8;
const OUTPUT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default)]
pub struct Tracer {
    config: TracingConfig,
    traces: HashMap<String, Trace>,
    order: Vec<String>,
}

impl Tracer {
    pub fn new(config: TracingConfig) -> Self {
        Self {
            config,
            traces: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Begin a new trace in the `running` state and return its id.
    pub fn start_trace(&mut self, agent_name: &str, query: &str, model: &str) -> String {
        let trace_id = loop {
            let candidate: String = Uuid::new_v4().simple().to_string().chars().take(TRACE_ID_LEN).collect();
            if !self.traces.contains_key(&candidate) {
                break candidate;
            }
        };

        if self.config.verbose {
            log::info!("[{}] Started trace for agent '{}' ({}): {}", trace_id, agent_name, model, query);
        } else {
            log::debug!("[{}] Started trace for agent '{}'", trace_id, agent_name);
        }

        self.traces.insert(trace_id.clone(), Trace::new(trace_id.clone(), agent_name, query, model));
        self.order.push(trace_id.clone());
        trace_id
    }

    /// Append a step to a running trace and fold it into the totals.
    pub fn log_step(&mut self, trace_id: &str, step: AgentStep) -> Result<(), TracerError> {
        let verbose = self.config.verbose;
        let trace = self.running_trace_mut(trace_id)?;

        if verbose {
            log::info!(
                "[{}] Step {}: {:.2} ms, ${:.6}, tools: {}",
                trace_id,
                step.step_number,
                step.duration_ms,
                step.cost_usd,
                format_tool_names(&step)
            );
        }

        trace.push_step(step);
        Ok(())
    }

    /// Move a running trace to a terminal status.
    pub fn end_trace(
        &mut self,
        trace_id: &str,
        output: impl Into<String>,
        status: TraceStatus,
        error: Option<String>,
    ) -> Result<(), TracerError> {
        if !status.is_terminal() {
            return Err(TracerError::InvalidStatus(status));
        }

        let verbose = self.config.verbose;
        let trace = self.running_trace_mut(trace_id)?;
        trace.final_output = Some(output.into());
        trace.status = status;
        trace.error = error;

        if verbose {
            log::info!(
                "[{}] Finished with status {}: {} steps, {} tokens, ${:.6}, {:.2} ms",
                trace_id,
                trace.status,
                trace.steps.len(),
                trace.total_input_tokens + trace.total_output_tokens,
                trace.total_cost_usd,
                trace.total_duration_ms
            );
        }

        if let Some(path) = self.config.trace_file.as_deref() {
            if let Some(trace) = self.traces.get(trace_id) {
                append_trace_line(path, trace);
            }
        }

        Ok(())
    }

    fn running_trace_mut(&mut self, trace_id: &str) -> Result<&mut Trace, TracerError> {
        let trace = self
            .traces
            .get_mut(trace_id)
            .ok_or_else(|| TracerError::UnknownTrace(trace_id.to_string()))?;

        if trace.status.is_terminal() {
            return Err(TracerError::AlreadyTerminal {
                trace_id: trace_id.to_string(),
                status: trace.status,
            });
        }

        Ok(trace)
    }

    pub fn get_trace(&self, trace_id: &str) -> Option<&Trace> {
        self.traces.get(trace_id)
    }

    fn require_trace(&self, trace_id: &str) -> Result<&Trace, TracerError> {
        self.traces
            .get(trace_id)
            .ok_or_else(|| TracerError::UnknownTrace(trace_id.to_string()))
    }

    /// Pretty-printed JSON for one trace.
    pub fn get_trace_json(&self, trace_id: &str) -> Result<String, TracerError> {
        let trace = self.require_trace(trace_id)?;
        serde_json::to_string_pretty(trace).map_err(|e| TracerError::Serialization {
            trace_id: trace_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Human-readable report for one trace.
    pub fn summary(&self, trace_id: &str) -> Result<String, TracerError> {
        let trace = self.require_trace(trace_id)?;
        let mut lines = Vec::new();

        lines.push(format!("Trace {} [{}]", trace.trace_id, trace.status));
        lines.push(format!("Agent: {}", trace.agent_name));
        lines.push(format!("Model: {}", trace.model));
        lines.push(format!("Query: {}", trace.input_query));
        lines.push("Steps:".to_string());

        if trace.steps.is_empty() {
            lines.push("  (none)".to_string());
        }
        for step in &trace.steps {
            lines.push(format!(
                "  Step {}: {:.2} ms, ${:.6}, tools: {}",
                step.step_number,
                step.duration_ms,
                step.cost_usd,
                format_tool_names(step)
            ));
        }

        lines.push(format!(
            "Totals: {} steps, {} input tokens, {} output tokens, ${:.6}, {:.2} ms",
            trace.steps.len(),
            trace.total_input_tokens,
            trace.total_output_tokens,
            trace.total_cost_usd,
            trace.total_duration_ms
        ));

        if let Some(error) = &trace.error {
            lines.push(format!("Error: {}", error));
        }

        let preview = trace
            .final_output
            .as_deref()
            .map(preview_text)
            .unwrap_or_else(|| "(none)".to_string());
        lines.push(format!("Final output: {}", preview));

        Ok(lines.join("\n"))
    }

    /// Write the summary for one trace to stdout.
    pub fn print_summary(&self, trace_id: &str) -> Result<(), TracerError> {
        let summary = self.summary(trace_id)?;
        println!("{}", summary);
        Ok(())
    }

    /// Evict a trace from the table.
    pub fn remove_trace(&mut self, trace_id: &str) -> Option<Trace> {
        let removed = self.traces.remove(trace_id)?;
        self.order.retain(|id| id != trace_id);
        Some(removed)
    }

    /// All traces in the order they were started.
    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.order.iter().filter_map(|id| self.traces.get(id))
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

fn format_tool_names(step: &AgentStep) -> String {
    let names = step.tool_names();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn preview_text(text: &str) -> String {
    if text.chars().count() <= OUTPUT_PREVIEW_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(OUTPUT_PREVIEW_CHARS).collect();
    format!("{}...", truncated)
}

/// Append one trace as a compact JSON line. Failures are logged only.
fn append_trace_line(path: &Path, trace: &Trace) {
    let line = match serde_json::to_string(trace) {
        Ok(line) => line,
        Err(e) => {
            log::error!("Failed to serialize trace {}: {}", trace.trace_id, e);
            return;
        }
    };

    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{}", line));

    if let Err(e) = result {
        log::error!("Failed to write trace {} to {}: {}", trace.trace_id, path.display(), e);
    }
}
