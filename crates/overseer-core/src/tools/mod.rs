//! Tool system for the supervised agent
//!
//! Tools are registered by name in a [`ToolRegistry`]. The registry validates
//! arguments against each tool's JSON schema and turns every result, good or
//! bad, into a [`ToolOutcome`] envelope so a failing tool never aborts a run.

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::types::{default_search_fixtures, SearchFixture};
use crate::errors::AgentError;
use crate::llm::ToolMetadata;

pub mod calculator;
pub mod expression;
pub mod search;

pub use calculator::CalculatorTool;
pub use expression::{evaluate_expression, ExpressionError, ExpressionTool};
pub use search::KnowledgeBaseSearchTool;

// Core Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<Value, AgentError>;
}

/// Uniform result envelope for a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Text fed back to the model as the tool message content.
    pub fn to_transcript_text(&self) -> String {
        if self.success {
            match &self.result {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None => String::new(),
            }
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}

// Tool registry for managing multiple tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            log::warn!("Tool '{}' was registered twice; keeping the latest", name);
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Schemas of all registered tools, ordered by name.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.tools.values().map(|tool| tool.metadata()).collect()
    }

    pub fn remove_tool(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute a tool. Never returns an error; failures are
    /// reported through the envelope.
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolOutcome {
        let Some(tool) = self.get_tool(name) else {
            log::warn!("Model requested unknown tool '{}'", name);
            return ToolOutcome::failure(format!("Unknown tool '{}'", name));
        };

        let metadata = tool.metadata();
        if let Err(message) = validate_arguments(&metadata, &arguments) {
            log::debug!("Rejected arguments for '{}': {}", name, message);
            return ToolOutcome::failure(message);
        }

        match tool.execute(arguments).await {
            Ok(result) => ToolOutcome::ok(result),
            Err(AgentError::ToolError { message, .. }) => ToolOutcome::failure(message),
            Err(other) => ToolOutcome::failure(other.to_string()),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_arguments(metadata: &ToolMetadata, arguments: &Value) -> Result<(), String> {
    let schema = JSONSchema::compile(&metadata.input_schema)
        .map_err(|e| format!("Tool '{}' has an invalid input schema: {}", metadata.name, e))?;

    if let Err(errors) = schema.validate(arguments) {
        let details: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(format!(
            "Invalid arguments for '{}': {}",
            metadata.name,
            details.join("; ")
        ));
    }

    Ok(())
}

// Tool factory for creating common tools
pub struct ToolFactory;

impl ToolFactory {
    pub fn create_search(fixtures: Vec<SearchFixture>) -> Arc<dyn Tool> {
        Arc::new(KnowledgeBaseSearchTool::new(fixtures))
    }

    pub fn create_expression_calculator() -> Arc<dyn Tool> {
        Arc::new(ExpressionTool::new())
    }

    pub fn create_calculator() -> Arc<dyn Tool> {
        Arc::new(CalculatorTool::new())
    }

    pub fn create_default_registry(fixtures: Vec<SearchFixture>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Self::create_search(fixtures));
        registry.register_tool(Self::create_expression_calculator());
        registry.register_tool(Self::create_calculator());
        registry
    }
}

/// Registry with `search`, `calculate` and `execute_calculation` over the built-in knowledge base.
pub fn default_registry() -> ToolRegistry {
    ToolFactory::create_default_registry(default_search_fixtures())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: "flaky".to_string(),
                description: "Always fails".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<Value, AgentError> {
            Err(AgentError::InternalError("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_tool_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tool_count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_registry_lists_tools_by_name() {
        let registry = default_registry();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["calculate", "execute_calculation", "search"]);
    }

    #[test]
    fn test_register_get_and_remove() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(ToolFactory::create_calculator());
        assert!(registry.get_tool("execute_calculation").is_some());
        assert!(registry.get_tool("nonexistent").is_none());

        assert!(registry.remove_tool("execute_calculation").is_some());
        assert_eq!(registry.tool_count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let registry = default_registry();
        let outcome = registry.invoke("search", json!({"query": "What is the capital of France?"})).await;
        assert!(outcome.success);
        assert_eq!(outcome.to_transcript_text(), "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = default_registry();
        let outcome = registry.invoke("teleport", json!({})).await;
        assert!(!outcome.success);
        assert_eq!(outcome.to_transcript_text(), "Error: Unknown tool 'teleport'");
    }

    #[tokio::test]
    async fn test_invoke_rejects_schema_violations() {
        let registry = default_registry();
        let outcome = registry.invoke("search", json!({"q": "missing query"})).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Invalid arguments for 'search'"));

        let outcome = registry
            .invoke("execute_calculation", json!({"operation": "modulo", "operand_a": 1, "operand_b": 2}))
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_tool_errors_become_failures() {
        let registry = default_registry();
        let outcome = registry.invoke("search", json!({"query": "quantum gravity"})).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.to_transcript_text(),
            "Error: No results found for 'quantum gravity'. Try searching with different keywords."
        );

        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(FailingTool));
        let outcome = registry.invoke("flaky", json!({})).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("disk on fire"));
    }

    #[test]
    fn test_outcome_transcript_text_for_structured_results() {
        assert_eq!(ToolOutcome::ok(json!(15.0)).to_transcript_text(), "15.0");
        assert_eq!(ToolOutcome::ok(json!({"a": 1})).to_transcript_text(), r#"{"a":1}"#);
        assert_eq!(ToolOutcome::failure("nope").to_transcript_text(), "Error: nope");
    }
}
