//! Configuration type definitions for the supervisor
//!
//! Every section has defaults, so an empty YAML document is a valid
//! configuration that points at a local OpenAI-compatible endpoint. Sections
//! only need to appear when a value differs from the default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core_types::Usage;
use crate::errors::AgentError;
use crate::loop_detection::LoopDetectionConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverseerConfig {
    #[serde(default)]
    pub agent: AgentDefinition,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub loop_detection: LoopDetectionConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Connection settings for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Resolved from `api_key_env` at load time; never read from YAML.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub pricing: ModelPricing,
}

/// Per-token prices used to compute step cost, in USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default = "default_input_price")]
    pub input_per_million: f64,
    #[serde(default = "default_output_price")]
    pub output_per_million: f64,
}

impl ModelPricing {
    pub fn free() -> Self {
        Self {
            input_per_million: 0.0,
            output_per_million: 0.0,
        }
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let cost = (input_tokens as f64 * self.input_per_million
            + output_tokens as f64 * self.output_per_million)
            / 1_000_000.0;
        cost.max(0.0)
    }

    pub fn cost_for_usage(&self, usage: Option<&Usage>) -> f64 {
        match usage {
            Some(usage) => self.cost(usage.prompt_tokens as u64, usage.completion_tokens as u64),
            None => 0.0,
        }
    }
}

/// Execution tracer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Log trace lifecycle events at info level
    #[serde(default)]
    pub verbose: bool,
    /// Append every finished trace as one JSON line to this file
    #[serde(default)]
    pub trace_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_revisions")]
    pub max_revisions: usize,
    #[serde(default)]
    pub researcher: SpecialistOverride,
    #[serde(default)]
    pub analyst: SpecialistOverride,
    #[serde(default)]
    pub writer: SpecialistOverride,
}

/// Optional replacements for a specialist's built-in prompt and step budget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialistOverride {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_steps: Option<usize>,
}

/// Knowledge base served by the built-in `search` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_fixtures")]
    pub fixtures: Vec<SearchFixture>,
}

/// A query key and the answer returned when a search mentions it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFixture {
    pub key: String,
    pub answer: String,
}

impl SearchFixture {
    pub fn new(key: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            answer: answer.into(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_agent_name() -> String { "agent".to_string() }
fn default_max_steps() -> usize { 10 }
fn default_endpoint_url() -> String { "http://localhost:8080".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_input_price() -> f64 { 0.15 }
fn default_output_price() -> f64 { 0.60 }
fn default_max_revisions() -> usize { 2 }
fn default_log_level() -> String { "info".to_string() }

pub fn default_search_fixtures() -> Vec<SearchFixture> {
    vec![
        SearchFixture::new("capital of france", "Paris is the capital of France."),
        SearchFixture::new(
            "population of paris",
            "The population of Paris is approximately 2.1 million.",
        ),
        SearchFixture::new(
            "python programming",
            "Python is a high-level programming language.",
        ),
    ]
}

impl Default for AgentDefinition {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_steps: default_max_steps(),
            system_prompt: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            model: default_model(),
            api_key_env: None,
            api_key: None,
            pricing: ModelPricing::default(),
        }
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self {
            input_per_million: default_input_price(),
            output_per_million: default_output_price(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_revisions: default_max_revisions(),
            researcher: SpecialistOverride::default(),
            analyst: SpecialistOverride::default(),
            writer: SpecialistOverride::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fixtures: default_search_fixtures(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl OverseerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.agent.name.trim().is_empty() {
            return Err(AgentError::ConfigError("Agent name cannot be empty".to_string()));
        }

        if self.agent.max_steps == 0 {
            return Err(AgentError::ConfigError("Agent max_steps must be greater than 0".to_string()));
        }

        if self.llm.endpoint_url.trim().is_empty() {
            return Err(AgentError::ConfigError("LLM endpoint_url cannot be empty".to_string()));
        }

        if !(self.llm.endpoint_url.starts_with("http://") || self.llm.endpoint_url.starts_with("https://")) {
            return Err(AgentError::ConfigError(format!(
                "LLM endpoint_url must start with http:// or https://, got '{}'",
                self.llm.endpoint_url
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AgentError::ConfigError("LLM model cannot be empty".to_string()));
        }

        let pricing = &self.llm.pricing;
        if pricing.input_per_million < 0.0 || pricing.output_per_million < 0.0 {
            return Err(AgentError::ConfigError("LLM pricing cannot be negative".to_string()));
        }

        self.validate_loop_detection()?;

        for (role, override_config) in [
            ("researcher", &self.orchestrator.researcher),
            ("analyst", &self.orchestrator.analyst),
            ("writer", &self.orchestrator.writer),
        ] {
            if override_config.max_steps == Some(0) {
                return Err(AgentError::ConfigError(format!(
                    "Orchestrator {} max_steps must be greater than 0",
                    role
                )));
            }
        }

        for fixture in &self.search.fixtures {
            if fixture.key.trim().is_empty() {
                return Err(AgentError::ConfigError("Search fixture key cannot be empty".to_string()));
            }
        }

        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(AgentError::ConfigError(format!(
                "Unknown logging level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }

    fn validate_loop_detection(&self) -> Result<(), AgentError> {
        let loop_config = &self.loop_detection;

        if loop_config.exact_threshold < 2 {
            return Err(AgentError::ConfigError(
                "loop_detection.exact_threshold must be at least 2".to_string(),
            ));
        }

        if !(loop_config.fuzzy_threshold > 0.0 && loop_config.fuzzy_threshold <= 1.0) {
            return Err(AgentError::ConfigError(format!(
                "loop_detection.fuzzy_threshold must be in (0, 1], got {}",
                loop_config.fuzzy_threshold
            )));
        }

        if loop_config.stagnation_window < 2 {
            return Err(AgentError::ConfigError(
                "loop_detection.stagnation_window must be at least 2".to_string(),
            ));
        }

        if loop_config.fuzzy_lookback == 0 {
            return Err(AgentError::ConfigError(
                "loop_detection.fuzzy_lookback must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
