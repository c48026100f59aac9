//! Loop detection system for preventing runaway tool call patterns
//!
//! This module detects when an agent is stuck by analysing the tool calls it
//! requests and the text it produces. Three strategies are layered: exact
//! repeats of a call, near-repeats with highly similar arguments, and output
//! stagnation where successive answers barely change.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod detector;
pub mod similarity;

pub use detector::*;
pub use similarity::*;

/// Configuration for loop detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopDetectionConfig {
    /// Number of identical calls (including the current one) that counts as a loop
    pub exact_threshold: usize,
    /// Word-level Jaccard similarity at which two argument strings count as the same
    pub fuzzy_threshold: f64,
    /// Number of recent outputs compared for stagnation
    pub stagnation_window: usize,
    /// Number of recent tool calls scanned by the fuzzy strategy
    pub fuzzy_lookback: usize,
}

impl Default for LoopDetectionConfig {
    fn default() -> Self {
        Self {
            exact_threshold: 2,
            fuzzy_threshold: 0.8,
            stagnation_window: 3,
            fuzzy_lookback: 5,
        }
    }
}

/// Strategy that produced a detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStrategy {
    /// Same tool called with identical arguments
    Exact,
    /// Same tool called with highly similar arguments
    Fuzzy,
    /// Recent outputs are nearly identical
    Stagnation,
    /// No loop detected
    None,
}

impl fmt::Display for LoopStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopStrategy::Exact => "exact",
            LoopStrategy::Fuzzy => "fuzzy",
            LoopStrategy::Stagnation => "stagnation",
            LoopStrategy::None => "none",
        };
        f.write_str(name)
    }
}

/// Outcome of a single loop check. Returned fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDetectionResult {
    pub is_looping: bool,
    pub strategy: LoopStrategy,
    pub message: String,
    /// Detection confidence between 0.0 and 1.0
    pub confidence: f64,
}

impl LoopDetectionResult {
    pub fn not_looping() -> Self {
        Self {
            is_looping: false,
            strategy: LoopStrategy::None,
            message: String::new(),
            confidence: 0.0,
        }
    }

    pub fn looping(strategy: LoopStrategy, message: String, confidence: f64) -> Self {
        Self {
            is_looping: true,
            strategy,
            message,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
