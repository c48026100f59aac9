use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use overseer_core::config::{ConfigLoader, OverseerConfig};
use overseer_core::tools::ToolFactory;
use overseer_core::{AgentConfig, HttpLLMClient, MultiAgentOrchestrator, RunStatus, StepSupervisor, LLM};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "Overseer", author, version = "0.1.0", about = "Supervised runs for tool-calling LLM agents")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, help = "Path to a YAML configuration file; built-in defaults are used when omitted")]
    config: Option<PathBuf>,

    #[clap(long, short, help = "Log level (overrides logging.level from the configuration)")]
    log_level: Option<String>,

    #[clap(long, help = "Model endpoint base URL (overrides llm.endpoint_url)")]
    endpoint: Option<String>,

    #[clap(long, help = "Model name (overrides llm.model)")]
    model: Option<String>,

    #[clap(long, help = "Print machine-readable JSON instead of text")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one supervised agent on a query with the built-in tools
    Run {
        query: String,

        #[clap(long, help = "Step budget (overrides agent.max_steps)")]
        max_steps: Option<usize>,
    },
    /// Run the research, analysis, writing and review pipeline on a query
    Orchestrate {
        query: String,

        #[clap(long, help = "Review rounds (overrides orchestrator.max_revisions)")]
        max_revisions: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(cli.config.as_ref()).await?;
    if let Some(endpoint) = &cli.endpoint {
        config.llm.endpoint_url = endpoint.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let log_level_filter = level.parse().unwrap_or(LevelFilter::Info);
    // Logs go to stderr so stdout carries only the result.
    env_logger::Builder::new().filter_level(log_level_filter).init();

    let llm: Arc<dyn LLM> = Arc::new(HttpLLMClient::from_config(&config.llm));
    log::info!("Using model '{}' at {}", config.llm.model, config.llm.endpoint_url);

    match cli.command {
        Commands::Run { query, max_steps } => {
            if let Some(max_steps) = max_steps {
                config.agent.max_steps = max_steps;
            }
            config.validate()?;
            run_agent(llm, &config, &query, cli.json).await
        }
        Commands::Orchestrate { query, max_revisions } => {
            if let Some(max_revisions) = max_revisions {
                config.orchestrator.max_revisions = max_revisions;
            }
            config.validate()?;
            run_orchestration(llm, &config, &query, cli.json).await
        }
    }
}

async fn load_configuration(path: Option<&PathBuf>) -> Result<OverseerConfig> {
    match path {
        Some(path) => ConfigLoader::from_file(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(ConfigLoader::from_str("").await?),
    }
}

async fn run_agent(llm: Arc<dyn LLM>, config: &OverseerConfig, query: &str, json: bool) -> Result<()> {
    let tools = Arc::new(ToolFactory::create_default_registry(config.search.fixtures.clone()));
    let mut supervisor = StepSupervisor::new(llm, tools, AgentConfig::from_config(config));

    let outcome = supervisor.run(query).await?;
    if outcome.status == RunStatus::MaxStepsExceeded {
        log::warn!(
            "Run stopped after {} steps ({} tool calls blocked)",
            outcome.steps_taken,
            outcome.blocked_tool_calls
        );
    }

    if json {
        println!("{}", supervisor.tracer().get_trace_json(&outcome.trace_id)?);
    } else {
        supervisor.tracer().print_summary(&outcome.trace_id)?;
        println!();
        println!("{}", outcome.answer);
    }
    Ok(())
}

async fn run_orchestration(llm: Arc<dyn LLM>, config: &OverseerConfig, query: &str, json: bool) -> Result<()> {
    let tools = Arc::new(ToolFactory::create_default_registry(config.search.fixtures.clone()));
    let orchestrator = MultiAgentOrchestrator::from_config(llm, tools, config);

    let report = orchestrator.run(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Workspace entries: {}, revisions: {}, approved: {}",
            report.workspace_entries, report.revision_count, report.approved
        );
        let total_cost: f64 = report.traces.iter().map(|trace| trace.total_cost_usd).sum();
        println!("Specialist runs: {}, total cost: ${:.6}", report.traces.len(), total_cost);
        println!();
        println!("{}", report.output);
    }
    Ok(())
}
