//! Structured two-operand arithmetic tool
//!
//! Exposed to the model as `execute_calculation`. Unlike the free-form
//! `calculate` tool, arguments arrive already split into an operation and two
//! numeric operands, so there is nothing to parse.

use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{json, Number, Value};

const TOOL_NAME: &str = "execute_calculation";

pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }

    fn operand(arguments: &Value, key: &str) -> Result<f64, AgentError> {
        arguments
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| tool_error(format!("Missing or invalid parameter '{}'", key)))
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

fn tool_error(message: impl Into<String>) -> AgentError {
    AgentError::ToolError {
        tool_name: TOOL_NAME.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Executes basic arithmetic operations (add, subtract, multiply, divide, pow).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["add", "subtract", "multiply", "divide", "pow"],
                        "description": "The arithmetic operation to perform"
                    },
                    "operand_a": {
                        "type": "number",
                        "description": "The first operand"
                    },
                    "operand_b": {
                        "type": "number",
                        "description": "The second operand"
                    }
                },
                "required": ["operation", "operand_a", "operand_b"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, AgentError> {
        let operation = arguments
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| tool_error("Missing or invalid 'operation' parameter"))?;
        let a = Self::operand(&arguments, "operand_a")?;
        let b = Self::operand(&arguments, "operand_b")?;

        let result = match operation {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Err(tool_error("Division by zero is not allowed"));
                }
                a / b
            }
            "pow" => a.powf(b),
            other => return Err(tool_error(format!("Unsupported operation: {}", other))),
        };

        let number = Number::from_f64(result)
            .ok_or_else(|| tool_error(format!("Result of {} is not a finite number", operation)))?;

        log::debug!("execute_calculation: {} {} {} = {}", a, operation, b, result);
        Ok(Value::Number(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_operations() {
        let calc = CalculatorTool::new();
        let cases = [
            ("add", 10.0, 5.0, 15.0),
            ("subtract", 10.0, 5.0, 5.0),
            ("multiply", 10.0, 5.0, 50.0),
            ("divide", 10.0, 4.0, 2.5),
            ("pow", 2.0, 10.0, 1024.0),
        ];
        for (operation, a, b, expected) in cases {
            let result = calc
                .execute(json!({"operation": operation, "operand_a": a, "operand_b": b}))
                .await
                .unwrap();
            assert_eq!(result.as_f64(), Some(expected), "operation {}", operation);
        }
    }

    #[tokio::test]
    async fn test_division_by_zero() {
        let calc = CalculatorTool::new();
        let result = calc
            .execute(json!({"operation": "divide", "operand_a": 10, "operand_b": 0}))
            .await;
        match result {
            Err(AgentError::ToolError { message, .. }) => assert!(message.contains("Division by zero")),
            other => panic!("expected tool error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_finite_result() {
        let calc = CalculatorTool::new();
        let result = calc
            .execute(json!({"operation": "pow", "operand_a": 10, "operand_b": 400}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_operation_and_missing_operand() {
        let calc = CalculatorTool::new();
        assert!(calc
            .execute(json!({"operation": "sqrt", "operand_a": 4, "operand_b": 0}))
            .await
            .is_err());
        assert!(calc.execute(json!({"operation": "add", "operand_a": 4})).await.is_err());
    }

    #[test]
    fn test_metadata() {
        let metadata = CalculatorTool::new().metadata();
        assert_eq!(metadata.name, "execute_calculation");
        assert_eq!(metadata.input_schema["required"], json!(["operation", "operand_a", "operand_b"]));
    }
}
