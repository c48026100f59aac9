//! Configuration module for the supervisor
//!
//! YAML configuration covering the agent, model endpoint, loop detection,
//! tracing, the orchestrator pipeline, the built-in search knowledge base and
//! logging.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;


use crate::errors::AgentError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<OverseerConfig, AgentError> {
    ConfigLoader::from_file(path).await
}
