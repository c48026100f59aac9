//! Research, analysis, writing and review pipeline over three specialists.
//!
//! Every specialist call is an independent supervised run with its own
//! tracer and loop detector. Research instructions fan out concurrently on a
//! [`JoinSet`]; everything after that is sequential and reads from the shared
//! [`Workspace`].

pub mod specialists;
pub mod workspace;

pub use specialists::{Specialist, SpecialistRole};
pub use workspace::{EntryType, Workspace, WorkspaceEntry};

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::agent::{AgentConfig, StepSupervisor};
use crate::config::types::{OrchestratorConfig, OverseerConfig};
use crate::errors::AgentError;
use crate::llm::LLM;
use crate::tools::ToolRegistry;
use crate::trace::Trace;

const RESEARCH_PREFIX: &str = "Research the following topic thoroughly: ";
const SPLIT_SEPARATORS: [&str; 4] = [" versus ", " vs ", " vs. ", " and "];
const COMPARISON_KEYWORDS: [&str; 3] = ["compare", "versus", "vs"];
const APPROVAL_PATTERN: &str = r"(?i)approved";

/// Break a query into one research instruction per compared subject.
///
/// Comparative queries ("X versus Y", "compare X and Y") are split on the
/// first separator that yields at least two non-empty parts. Anything else
/// becomes a single instruction covering the whole query.
pub fn plan_research(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let comparative = COMPARISON_KEYWORDS.iter().any(|keyword| lowered.contains(keyword));

    if comparative {
        for separator in SPLIT_SEPARATORS {
            if !lowered.contains(separator) {
                continue;
            }
            let parts: Vec<&str> = query
                .split(separator)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
            if parts.len() >= 2 {
                return parts
                    .into_iter()
                    .map(|part| format!("{}{}", RESEARCH_PREFIX, part))
                    .collect();
            }
        }
    }

    vec![format!("{}{}", RESEARCH_PREFIX, query)]
}

/// Result of one orchestration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationReport {
    pub output: String,
    /// Every workspace entry written, counting each revised draft as its own entry.
    pub workspace_entries: usize,
    pub revision_count: usize,
    pub approved: bool,
    pub traces: Vec<Trace>,
}

struct SpecialistRun {
    answer: String,
    trace: Option<Trace>,
}

pub struct MultiAgentOrchestrator {
    llm: Arc<dyn LLM>,
    research_tools: Arc<ToolRegistry>,
    no_tools: Arc<ToolRegistry>,
    researcher: Specialist,
    analyst: Specialist,
    writer: Specialist,
    max_revisions: usize,
    base: AgentConfig,
}

impl MultiAgentOrchestrator {
    pub fn new(
        llm: Arc<dyn LLM>,
        research_tools: Arc<ToolRegistry>,
        base: AgentConfig,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            llm,
            research_tools,
            no_tools: Arc::new(ToolRegistry::new()),
            researcher: Specialist::researcher().with_override(&config.researcher),
            analyst: Specialist::analyst().with_override(&config.analyst),
            writer: Specialist::writer().with_override(&config.writer),
            max_revisions: config.max_revisions,
            base,
        }
    }

    pub fn from_config(llm: Arc<dyn LLM>, research_tools: Arc<ToolRegistry>, config: &OverseerConfig) -> Self {
        Self::new(llm, research_tools, AgentConfig::from_config(config), &config.orchestrator)
    }

    pub fn specialist(&self, role: SpecialistRole) -> &Specialist {
        match role {
            SpecialistRole::Researcher => &self.researcher,
            SpecialistRole::Analyst => &self.analyst,
            SpecialistRole::Writer => &self.writer,
        }
    }

    pub fn max_revisions(&self) -> usize {
        self.max_revisions
    }

    pub async fn run(&self, query: &str) -> Result<OrchestrationReport, AgentError> {
        let approval = Regex::new(APPROVAL_PATTERN).map_err(|e| AgentError::InternalError(e.to_string()))?;
        let mut workspace = Workspace::new();
        let mut traces = Vec::new();

        let instructions = plan_research(query);
        log::info!("Orchestrating '{}' with {} research task(s)", query, instructions.len());
        for finding in self.research(instructions).await? {
            traces.extend(finding.trace);
            workspace.write(SpecialistRole::Researcher, EntryType::Research, finding.answer);
        }

        let analysis_task = format!(
            "Analyze these findings for: {}\n\n{}",
            query,
            workspace.render_by_type(EntryType::Research)
        );
        let analysis = self.consult(&self.analyst, &analysis_task, &mut traces).await?;
        workspace.write(SpecialistRole::Analyst, EntryType::Analysis, analysis);

        let writing_task = format!("Write a report for: {}\n\n{}", query, workspace.read_all());
        let mut draft = self.consult(&self.writer, &writing_task, &mut traces).await?;
        workspace.write(SpecialistRole::Writer, EntryType::Draft, draft.clone());

        let mut approved = false;
        for round in 1..=self.max_revisions {
            let review_task = format!(
                "Review this draft for: {}\n\nDraft:\n{}\n\nIf acceptable, respond with: APPROVED\nOtherwise, provide revision instructions.",
                query, draft
            );
            let review = self.consult(&self.analyst, &review_task, &mut traces).await?;
            if approval.is_match(&review) {
                log::info!("Draft approved in review round {}", round);
                approved = true;
                break;
            }

            log::info!("Review round {} requested revisions", round);
            workspace.write(SpecialistRole::Analyst, EntryType::RevisionNote, review.clone());
            let revision_task = format!(
                "Revise based on feedback:\n\nQuery: {}\nDraft:\n{}\nFeedback:\n{}",
                query, draft, review
            );
            draft = self.consult(&self.writer, &revision_task, &mut traces).await?;
            workspace.write(SpecialistRole::Writer, EntryType::Draft, draft.clone());
        }

        if !approved {
            log::warn!("Returning unapproved draft after {} revision(s)", self.max_revisions);
        }

        Ok(OrchestrationReport {
            output: draft,
            workspace_entries: workspace.len(),
            revision_count: workspace.count_by_type(EntryType::RevisionNote),
            approved,
            traces,
        })
    }

    /// Run every research instruction concurrently and return the findings
    /// in instruction order.
    async fn research(&self, instructions: Vec<String>) -> Result<Vec<SpecialistRun>, AgentError> {
        let mut tasks = JoinSet::new();
        for (index, instruction) in instructions.into_iter().enumerate() {
            let llm = Arc::clone(&self.llm);
            let tools = Arc::clone(&self.research_tools);
            let specialist = self.researcher.clone();
            let base = self.base.clone();
            tasks.spawn(async move {
                let result = run_specialist(llm, tools, &specialist, &base, &instruction).await;
                (index, result)
            });
        }

        let mut findings = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| AgentError::InternalError(format!("Research task failed: {}", e)))?;
            findings.push((index, result?));
        }
        findings.sort_by_key(|(index, _)| *index);
        Ok(findings.into_iter().map(|(_, finding)| finding).collect())
    }

    async fn consult(&self, specialist: &Specialist, task: &str, traces: &mut Vec<Trace>) -> Result<String, AgentError> {
        let run = run_specialist(
            Arc::clone(&self.llm),
            Arc::clone(&self.no_tools),
            specialist,
            &self.base,
            task,
        )
        .await?;
        traces.extend(run.trace);
        Ok(run.answer)
    }
}

async fn run_specialist(
    llm: Arc<dyn LLM>,
    tools: Arc<ToolRegistry>,
    specialist: &Specialist,
    base: &AgentConfig,
    task: &str,
) -> Result<SpecialistRun, AgentError> {
    let mut supervisor = StepSupervisor::new(llm, tools, specialist.agent_config(base));
    let outcome = supervisor.run(task).await?;
    let trace = supervisor.tracer_mut().remove_trace(&outcome.trace_id);
    Ok(SpecialistRun {
        answer: outcome.answer,
        trace,
    })
}
