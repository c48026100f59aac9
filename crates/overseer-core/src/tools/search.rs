//! Knowledge-base search tool
//!
//! Answers a query from a fixed set of fixtures. A query matches a fixture
//! when it contains the fixture key, ignoring case; the first match wins.
//! Unmatched queries fail, which is what drives a careless agent into
//! retrying with reworded searches.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::types::SearchFixture;
use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

pub struct KnowledgeBaseSearchTool {
    fixtures: Vec<SearchFixture>,
}

impl KnowledgeBaseSearchTool {
    pub fn new(fixtures: Vec<SearchFixture>) -> Self {
        Self { fixtures }
    }

    pub fn lookup(&self, query: &str) -> Option<&str> {
        let query_lower = query.to_lowercase();
        self.fixtures
            .iter()
            .find(|fixture| query_lower.contains(&fixture.key.to_lowercase()))
            .map(|fixture| fixture.answer.as_str())
    }
}

#[async_trait]
impl Tool for KnowledgeBaseSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "search".to_string(),
            description: "Search for information. Returns text results.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, AgentError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::ToolError {
                tool_name: "search".to_string(),
                message: "Missing or invalid 'query' parameter".to_string(),
            })?;

        match self.lookup(query) {
            Some(answer) => Ok(Value::String(answer.to_string())),
            None => Err(AgentError::ToolError {
                tool_name: "search".to_string(),
                message: format!(
                    "No results found for '{}'. Try searching with different keywords.",
                    query
                ),
            }),
        }
    }
}
