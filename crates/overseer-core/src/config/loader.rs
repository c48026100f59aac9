//! Configuration loader for YAML files and environment resolution
//!
//! Loading is parse, then resolve the API key from the environment, then
//! validate. A configuration returned from here is always valid.

use crate::config::types::*;
use crate::errors::AgentError;
use std::env;
use std::path::Path;
use tokio::fs;

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<OverseerConfig, AgentError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            AgentError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        log::debug!("Loaded configuration file {}", path.display());
        Self::from_str(&content).await
    }

    /// Load configuration from a YAML string
    pub async fn from_str(content: &str) -> Result<OverseerConfig, AgentError> {
        let mut config: OverseerConfig = if content.trim().is_empty() {
            OverseerConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| AgentError::ConfigError(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::resolve_llm_auth(&mut config.llm);

        config.validate()?;

        Ok(config)
    }

    /// Resolve the API key from the configured environment variable.
    ///
    /// A missing variable is not an error; local endpoints often need no key.
    fn resolve_llm_auth(llm: &mut LlmConfig) {
        if let Some(env_var) = &llm.api_key_env {
            match env::var(env_var) {
                Ok(api_key) if !api_key.is_empty() => llm.api_key = Some(api_key),
                _ => log::warn!(
                    "Environment variable {} is not set; requests will be sent without an API key",
                    env_var
                ),
            }
        }
    }
}
