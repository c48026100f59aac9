//! Specialist roles used by the orchestration pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::AgentConfig;
use crate::config::types::SpecialistOverride;

const RESEARCHER_PROMPT: &str = "You are a Research Specialist. Your ONLY job is to find and retrieve \
relevant information. Always cite sources. Return raw findings organized \
by source. Do NOT analyze or summarize.";

const ANALYST_PROMPT: &str = "You are an Analysis Specialist. Evaluate information, cross-reference \
claims, flag contradictions, identify gaps. Rate confidence: High/Medium/Low.";

const WRITER_PROMPT: &str = "You are a Writing Specialist. Produce clear, well-structured documents \
from analyzed research. Preserve citations. Include confidence qualifiers. \
Be concise.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialistRole {
    Researcher,
    Analyst,
    Writer,
}

impl SpecialistRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistRole::Researcher => "researcher",
            SpecialistRole::Analyst => "analyst",
            SpecialistRole::Writer => "writer",
        }
    }

    pub fn default_system_prompt(&self) -> &'static str {
        match self {
            SpecialistRole::Researcher => RESEARCHER_PROMPT,
            SpecialistRole::Analyst => ANALYST_PROMPT,
            SpecialistRole::Writer => WRITER_PROMPT,
        }
    }

    pub fn default_max_steps(&self) -> usize {
        match self {
            SpecialistRole::Researcher => 8,
            SpecialistRole::Analyst => 6,
            SpecialistRole::Writer => 4,
        }
    }
}

impl fmt::Display for SpecialistRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specialist {
    pub role: SpecialistRole,
    pub system_prompt: String,
    pub max_steps: usize,
}

impl Specialist {
    pub fn new(role: SpecialistRole) -> Self {
        Self {
            role,
            system_prompt: role.default_system_prompt().to_string(),
            max_steps: role.default_max_steps(),
        }
    }

    pub fn researcher() -> Self {
        Self::new(SpecialistRole::Researcher)
    }

    pub fn analyst() -> Self {
        Self::new(SpecialistRole::Analyst)
    }

    pub fn writer() -> Self {
        Self::new(SpecialistRole::Writer)
    }

    /// Apply configured replacements on top of the role defaults.
    pub fn with_override(mut self, override_config: &SpecialistOverride) -> Self {
        if let Some(system_prompt) = &override_config.system_prompt {
            self.system_prompt = system_prompt.clone();
        }
        if let Some(max_steps) = override_config.max_steps {
            self.max_steps = max_steps;
        }
        self
    }

    /// Supervisor configuration for one call to this specialist.
    pub fn agent_config(&self, base: &AgentConfig) -> AgentConfig {
        AgentConfig {
            agent_name: self.role.as_str().to_string(),
            max_steps: self.max_steps,
            system_prompt: Some(self.system_prompt.clone()),
            ..base.clone()
        }
    }
}
