//! Arithmetic expression evaluation for the `calculate` tool
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! number := digits ['.' digits]
//! ```
//!
//! Nothing outside this grammar is accepted, so the tool can never execute
//! anything but arithmetic.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluate an arithmetic expression.
pub fn evaluate_expression(input: &str) -> Result<f64, ExpressionError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(ExpressionError::Empty);
    }

    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some((position, found)) = parser.peek() {
        return Err(ExpressionError::UnexpectedChar { found, position });
    }
    Ok(value)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            input,
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expr(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '+')) => {
                    self.chars.next();
                    value += self.term()?;
                }
                Some((_, '-')) => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '*')) => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                Some((_, '/')) => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ExpressionError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ExpressionError::UnexpectedEnd),
            Some((_, '-')) => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some((_, '+')) => {
                self.chars.next();
                self.factor()
            }
            Some((_, '(')) => {
                self.chars.next();
                let value = self.expr()?;
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ')')) => Ok(value),
                    Some((position, found)) => Err(ExpressionError::UnexpectedChar { found, position }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some((start, c)) if c.is_ascii_digit() || c == '.' => self.number(start),
            Some((position, found)) => Err(ExpressionError::UnexpectedChar { found, position }),
        }
    }

    fn number(&mut self, start: usize) -> Result<f64, ExpressionError> {
        let mut end = start;
        while let Some((index, c)) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                end = index + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        let literal = &self.input[start..end];
        literal
            .parse::<f64>()
            .map_err(|_| ExpressionError::InvalidNumber(literal.to_string()))
    }
}

/// Render a result the way a person would write it: `4`, not `4.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub struct ExpressionTool;

impl ExpressionTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExpressionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ExpressionTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "calculate".to_string(),
            description: "Evaluate a math expression.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Math expression using numbers, + - * / and parentheses"
                    }
                },
                "required": ["expression"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, AgentError> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::ToolError {
                tool_name: "calculate".to_string(),
                message: "Missing or invalid 'expression' parameter".to_string(),
            })?;

        let value = evaluate_expression(expression).map_err(|e| AgentError::ToolError {
            tool_name: "calculate".to_string(),
            message: format!("Invalid expression: {}", e),
        })?;

        Ok(Value::String(format_number(value)))
    }
}
