//! Stateful loop detector for a single agent run
//!
//! The detector keeps the tool calls and outputs seen so far in the current
//! run. It must be reset at the start of every independent query so histories
//! never leak between runs.

use super::{LoopDetectionConfig, LoopDetectionResult, LoopStrategy};
use crate::loop_detection::similarity::{jaccard_similarity, mean_pairwise_similarity};

/// Detects repeated tool calls and stagnating outputs within one run
#[derive(Debug, Clone)]
pub struct LoopDetector {
    config: LoopDetectionConfig,
    tool_history: Vec<(String, String)>,
    output_history: Vec<String>,
}

impl LoopDetector {
    pub fn new(config: LoopDetectionConfig) -> Self {
        Self {
            config,
            tool_history: Vec::new(),
            output_history: Vec::new(),
        }
    }

    pub fn config(&self) -> &LoopDetectionConfig {
        &self.config
    }

    /// Check whether a tool call repeats earlier calls. Call this before executing the tool.
    ///
    /// The call is recorded in the history whatever the outcome, so later
    /// checks see it.
    pub fn check_tool_call(&mut self, tool_name: &str, tool_input: &str) -> LoopDetectionResult {
        let current = (tool_name.to_string(), tool_input.trim().to_string());

        let result = self
            .detect_exact(&current)
            .or_else(|| self.detect_fuzzy(&current))
            .unwrap_or_else(LoopDetectionResult::not_looping);

        self.tool_history.push(current);
        result
    }

    /// Layer 1: identical tool name and arguments.
    fn detect_exact(&self, current: &(String, String)) -> Option<LoopDetectionResult> {
        let previous = self.tool_history.iter().filter(|entry| *entry == current).count();
        let count = previous + 1;

        if count >= self.config.exact_threshold {
            return Some(LoopDetectionResult::looping(
                LoopStrategy::Exact,
                format!(
                    "Tool '{}' called {} times with identical arguments: {}",
                    current.0, count, current.1
                ),
                1.0,
            ));
        }

        None
    }

    /// Layer 2: same tool with arguments whose word sets mostly overlap.
    fn detect_fuzzy(&self, current: &(String, String)) -> Option<LoopDetectionResult> {
        let (tool_name, tool_input) = current;
        let mut matches = 0usize;
        let mut best_similarity: f64 = 0.0;

        for (name, args) in self.tool_history.iter().rev().take(self.config.fuzzy_lookback) {
            if name != tool_name {
                continue;
            }
            let similarity = jaccard_similarity(args, tool_input);
            if similarity >= self.config.fuzzy_threshold {
                matches += 1;
                best_similarity = best_similarity.max(similarity);
            }
        }

        if matches >= self.config.exact_threshold {
            return Some(LoopDetectionResult::looping(
                LoopStrategy::Fuzzy,
                format!(
                    "Tool '{}' called {} times recently with {:.0}% similar arguments",
                    tool_name,
                    matches + 1,
                    best_similarity * 100.0
                ),
                best_similarity,
            ));
        }

        None
    }

    /// Record an output and check whether recent outputs have stopped changing.
    ///
    /// This is an advisory signal; it never blocks an action on its own.
    pub fn check_output_stagnation(&mut self, output: &str) -> LoopDetectionResult {
        self.output_history.push(output.to_string());

        let window = self.config.stagnation_window;
        if window < 2 || self.output_history.len() < window {
            return LoopDetectionResult::not_looping();
        }

        let recent = &self.output_history[self.output_history.len() - window..];
        let mean = mean_pairwise_similarity(recent);

        if mean >= self.config.fuzzy_threshold {
            return LoopDetectionResult::looping(
                LoopStrategy::Stagnation,
                format!(
                    "Last {} outputs are {:.0}% similar on average",
                    window,
                    mean * 100.0
                ),
                mean,
            );
        }

        LoopDetectionResult::not_looping()
    }

    /// Clear all history. Called at the start of every new query.
    pub fn reset(&mut self) {
        self.tool_history.clear();
        self.output_history.clear();
    }

    pub fn tool_history(&self) -> &[(String, String)] {
        &self.tool_history
    }

    pub fn output_history(&self) -> &[String] {
        &self.output_history
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(LoopDetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_detection() {
        let mut detector = LoopDetector::default();
        let args = r#"{"query":"x"}"#;

        let first = detector.check_tool_call("search", args);
        assert!(!first.is_looping);
        assert_eq!(first.strategy, LoopStrategy::None);

        let second = detector.check_tool_call("search", args);
        assert!(second.is_looping);
        assert_eq!(second.strategy, LoopStrategy::Exact);
        assert_eq!(second.confidence, 1.0);
        assert!(second.message.contains("search"));

        let third = detector.check_tool_call("search", args);
        assert!(third.is_looping);
        assert_eq!(third.strategy, LoopStrategy::Exact);
    }

    #[test]
    fn test_exact_match_trims_input() {
        let mut detector = LoopDetector::default();
        detector.check_tool_call("search", "  python  ");
        let result = detector.check_tool_call("search", "python");
        assert!(result.is_looping);
        assert_eq!(result.strategy, LoopStrategy::Exact);
    }

    #[test]
    fn test_different_tools_do_not_collide() {
        let mut detector = LoopDetector::default();
        assert!(!detector.check_tool_call("search", "paris").is_looping);
        assert!(!detector.check_tool_call("calculate", "paris").is_looping);
    }

    #[test]
    fn test_fuzzy_match_detection() {
        let mut detector = LoopDetector::default();

        let first = detector.check_tool_call("search", "python tutorial basics");
        assert!(!first.is_looping);

        let second = detector.check_tool_call("search", "basics python tutorial");
        assert!(!second.is_looping);

        let third = detector.check_tool_call("search", "tutorial python basics");
        assert!(third.is_looping);
        assert_eq!(third.strategy, LoopStrategy::Fuzzy);
        assert_eq!(third.confidence, 1.0);
    }

    #[test]
    fn test_fuzzy_ignores_dissimilar_arguments() {
        let mut detector = LoopDetector::default();
        detector.check_tool_call("search", "capital of france");
        detector.check_tool_call("search", "population of paris");
        let result = detector.check_tool_call("search", "python programming language");
        assert!(!result.is_looping);
    }

    #[test]
    fn test_fuzzy_only_scans_recent_window() {
        let config = LoopDetectionConfig {
            fuzzy_lookback: 2,
            ..LoopDetectionConfig::default()
        };
        let mut detector = LoopDetector::new(config);
        detector.check_tool_call("search", "alpha beta gamma");
        detector.check_tool_call("search", "gamma beta alpha");
        detector.check_tool_call("calculate", "1 + 1");
        detector.check_tool_call("calculate", "2 + 2");

        // Both similar searches have fallen outside the two-entry window.
        let result = detector.check_tool_call("search", "beta alpha gamma");
        assert!(!result.is_looping);
    }

    #[test]
    fn test_history_records_every_call() {
        let mut detector = LoopDetector::default();
        detector.check_tool_call("search", "a");
        detector.check_tool_call("search", "a");
        detector.check_tool_call("search", "a");
        assert_eq!(detector.tool_history().len(), 3);
    }

    #[test]
    fn test_output_stagnation() {
        let mut detector = LoopDetector::default();
        assert!(!detector.check_output_stagnation("I could not find anything").is_looping);
        assert!(!detector.check_output_stagnation("I could not find anything").is_looping);

        let result = detector.check_output_stagnation("I could not find anything");
        assert!(result.is_looping);
        assert_eq!(result.strategy, LoopStrategy::Stagnation);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_output_progress_is_not_stagnation() {
        let mut detector = LoopDetector::default();
        detector.check_output_stagnation("searching for the capital");
        detector.check_output_stagnation("found paris as the answer");
        let result = detector.check_output_stagnation("population is two million");
        assert!(!result.is_looping);
        assert_eq!(result.strategy, LoopStrategy::None);
    }

    #[test]
    fn test_empty_inputs_degrade_gracefully() {
        let mut detector = LoopDetector::default();
        assert!(!detector.check_tool_call("", "").is_looping);
        assert!(!detector.check_output_stagnation("").is_looping);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut detector = LoopDetector::default();
        detector.check_tool_call("search", "x");
        detector.check_output_stagnation("out");
        detector.reset();

        assert!(detector.tool_history().is_empty());
        assert!(detector.output_history().is_empty());
        assert!(!detector.check_tool_call("search", "x").is_looping);
    }

    #[test]
    fn test_custom_exact_threshold() {
        let config = LoopDetectionConfig {
            exact_threshold: 3,
            ..LoopDetectionConfig::default()
        };
        let mut detector = LoopDetector::new(config);
        let first = detector.check_tool_call("search", "x");
        let second = detector.check_tool_call("search", "x");
        assert!(!first.is_looping);
        // Second identical call is below threshold; fuzzy sees only one match.
        assert!(!second.is_looping);
        assert_eq!(detector.check_tool_call("search", "x").strategy, LoopStrategy::Exact);
    }
}
