//! Step supervisor for a single tool-using agent.
//!
//! The supervisor drives the model/tool loop for one query at a time. Before
//! any tool runs, the call is checked by the [`LoopDetector`]; repeated calls
//! are answered with a synthetic message instead of being executed. Every
//! iteration is recorded as an [`AgentStep`] on a trace owned by this
//! supervisor's [`Tracer`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::types::{ModelPricing, OverseerConfig, TracingConfig};
use crate::core_types::{LLMResponse, Message, ToolCall};
use crate::errors::AgentError;
use crate::llm::{ToolMetadata, LLM};
use crate::loop_detection::{LoopDetectionConfig, LoopDetector};
use crate::tools::ToolRegistry;
use crate::trace::{AgentStep, ToolCallRecord, TraceStatus};
use crate::tracing::Tracer;

/// Answer returned when the step budget runs out.
pub const MAX_STEPS_ANSWER: &str = "[Max steps reached: agent likely stuck in a loop]";
pub const MAX_STEPS_ERROR: &str = "Max steps exceeded";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub agent_name: String,
    pub max_steps: usize,
    pub system_prompt: Option<String>,
    pub pricing: ModelPricing,
    pub loop_detection: LoopDetectionConfig,
    pub tracing: TracingConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "agent".to_string(),
            max_steps: 10,
            system_prompt: None,
            pricing: ModelPricing::default(),
            loop_detection: LoopDetectionConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_config(config: &OverseerConfig) -> Self {
        Self {
            agent_name: config.agent.name.clone(),
            max_steps: config.agent.max_steps,
            system_prompt: config.agent.system_prompt.clone(),
            pricing: config.llm.pricing,
            loop_detection: config.loop_detection.clone(),
            tracing: config.tracing.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    MaxStepsExceeded,
}

/// Result of one supervised run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub trace_id: String,
    pub answer: String,
    pub status: RunStatus,
    pub steps_taken: usize,
    pub blocked_tool_calls: usize,
    pub stagnation_detected: bool,
}

pub struct StepSupervisor {
    llm: Arc<dyn LLM>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    tracer: Tracer,
    loop_detector: LoopDetector,
    transcript: Vec<Message>,
}

/// Per-run counters threaded through the loop.
#[derive(Default)]
struct RunState {
    steps_taken: usize,
    blocked_tool_calls: usize,
    stagnation_detected: bool,
}

impl StepSupervisor {
    pub fn new(llm: Arc<dyn LLM>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let tracer = Tracer::new(config.tracing.clone());
        let loop_detector = LoopDetector::new(config.loop_detection.clone());
        Self {
            llm,
            tools,
            config,
            tracer,
            loop_detector,
            transcript: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tracer {
        &mut self.tracer
    }

    /// Transcript of the most recent run.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn loop_detector(&self) -> &LoopDetector {
        &self.loop_detector
    }

    /// Run the agent on one query until it answers or the step budget runs out.
    ///
    /// Only a failed model call is an error. Tool failures and blocked loops
    /// are fed back to the model, and an exhausted budget is a normal outcome.
    pub async fn run(&mut self, query: &str) -> Result<RunOutcome, AgentError> {
        self.loop_detector.reset();
        self.transcript.clear();

        let model = self.llm.model_name();
        let trace_id = self.tracer.start_trace(&self.config.agent_name, query, &model);
        log::info!("[{}] Agent '{}' run started: {}", trace_id, self.config.agent_name, query);

        if let Some(system_prompt) = &self.config.system_prompt {
            self.transcript.push(Message::system(system_prompt.clone()));
        }
        self.transcript.push(Message::user(query));

        let tool_schemas = self.tools.list_tools();
        let tools: Option<Vec<ToolMetadata>> = if tool_schemas.is_empty() { None } else { Some(tool_schemas) };

        let mut state = RunState::default();

        for step_number in 1..=self.config.max_steps {
            log::debug!("[{}] Step #{}", trace_id, step_number);
            let step_started = Instant::now();

            let response = match self.llm.generate(self.transcript.clone(), tools.clone()).await {
                Ok(response) => response,
                Err(e) => return Err(self.fail_run(&trace_id, e)),
            };

            if response.tool_calls.is_empty() && response.non_empty_content().is_none() {
                log::warn!("[{}] LLM did not provide content or tool calls on step {}", trace_id, step_number);
            } else {
                self.transcript.push(Message::Assistant {
                    content: response.content.clone(),
                    tool_calls: response.tool_calls.clone(),
                });
            }

            let reasoning = response.non_empty_content().map(str::to_string);
            if let Some(text) = &reasoning {
                let stagnation = self.loop_detector.check_output_stagnation(text);
                if stagnation.is_looping {
                    log::warn!("[{}] Output stagnation: {}", trace_id, stagnation.message);
                    state.stagnation_detected = true;
                }
            }

            let mut records = Vec::new();
            for call in &response.tool_calls {
                if let Some(record) = self.handle_tool_call(&trace_id, call, &mut state).await {
                    records.push(record);
                }
            }

            // A blank reply is recorded as a step but never ends the run.
            let done = response.tool_calls.is_empty() && reasoning.is_some();
            let step = self.build_step(step_number, &response, reasoning.clone(), records, step_started);
            self.tracer.log_step(&trace_id, step)?;
            state.steps_taken = step_number;

            if done {
                let answer = reasoning.unwrap_or_default();
                self.tracer.end_trace(&trace_id, answer.clone(), TraceStatus::Completed, None)?;
                log::info!("[{}] Agent finished after {} steps", trace_id, step_number);
                return Ok(RunOutcome {
                    trace_id,
                    answer,
                    status: RunStatus::Done,
                    steps_taken: state.steps_taken,
                    blocked_tool_calls: state.blocked_tool_calls,
                    stagnation_detected: state.stagnation_detected,
                });
            }
        }

        let status = if state.blocked_tool_calls > 0 {
            TraceStatus::LoopDetected
        } else {
            TraceStatus::Failed
        };
        log::warn!(
            "[{}] Agent reached max_steps ({}) without a final answer",
            trace_id,
            self.config.max_steps
        );
        self.tracer
            .end_trace(&trace_id, MAX_STEPS_ANSWER, status, Some(MAX_STEPS_ERROR.to_string()))?;

        Ok(RunOutcome {
            trace_id,
            answer: MAX_STEPS_ANSWER.to_string(),
            status: RunStatus::MaxStepsExceeded,
            steps_taken: state.steps_taken,
            blocked_tool_calls: state.blocked_tool_calls,
            stagnation_detected: state.stagnation_detected,
        })
    }

    /// Check one requested call for loops and execute it if allowed.
    ///
    /// Returns a record only when the tool was actually invoked.
    async fn handle_tool_call(
        &mut self,
        trace_id: &str,
        call: &ToolCall,
        state: &mut RunState,
    ) -> Option<ToolCallRecord> {
        let normalized = call.normalized_arguments();
        let check = self.loop_detector.check_tool_call(&call.name, &normalized);
        if check.is_looping {
            state.blocked_tool_calls += 1;
            log::warn!(
                "[{}] Blocked {} call ({}): {}",
                trace_id,
                call.name,
                check.strategy,
                check.message
            );
            self.transcript.push(Message::tool(
                call.id.clone(),
                call.name.clone(),
                format!("LOOP DETECTED: {}", check.message),
            ));
            return None;
        }

        let started = Instant::now();
        let (tool_input, output) = match call.parsed_arguments() {
            Ok(arguments) => {
                let outcome = self.tools.invoke(&call.name, arguments.clone()).await;
                (arguments, outcome.to_transcript_text())
            }
            Err(e) => (
                Value::String(call.arguments.clone()),
                format!("Error: Invalid JSON arguments: {}", e),
            ),
        };
        let duration_ms = elapsed_ms(started);

        log::info!("[{}] {} -> {}", trace_id, call.name, output);
        self.transcript
            .push(Message::tool(call.id.clone(), call.name.clone(), output.clone()));

        Some(ToolCallRecord::new(call.name.clone(), tool_input, output, duration_ms))
    }

    fn build_step(
        &self,
        step_number: usize,
        response: &LLMResponse,
        reasoning: Option<String>,
        records: Vec<ToolCallRecord>,
        started: Instant,
    ) -> AgentStep {
        let (input_tokens, output_tokens) = response
            .usage
            .as_ref()
            .map(|usage| (usage.prompt_tokens as u64, usage.completion_tokens as u64))
            .unwrap_or((0, 0));

        AgentStep::new(step_number)
            .with_reasoning(reasoning)
            .with_tool_calls(records)
            .with_tokens(input_tokens, output_tokens)
            .with_cost(self.config.pricing.cost(input_tokens, output_tokens))
            .with_duration(elapsed_ms(started))
    }

    /// End the trace as failed and turn the cause into a model-call error.
    fn fail_run(&mut self, trace_id: &str, error: AgentError) -> AgentError {
        let error = match error {
            AgentError::ModelCall(_) => error,
            other => AgentError::ModelCall(other.to_string()),
        };
        log::error!("[{}] {}", trace_id, error);

        if let Err(e) = self
            .tracer
            .end_trace(trace_id, "", TraceStatus::Failed, Some(error.to_string()))
        {
            log::error!("[{}] Could not close trace: {}", trace_id, e);
        }
        error
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
