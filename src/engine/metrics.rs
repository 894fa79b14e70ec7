//! Execution metrics.
//!
//! Every run records how long each rule took to evaluate and what became of
//! it. The numbers are cheap to collect (one `Instant` per rule) and are
//! surfaced through `JsonPathMapper::map_verbose` and the CLI run report.
//!
//! In independent mode `evaluate` is the wall time of the whole fan-out, not
//! the sum of the per-rule durations.

use super::ExecutionMode;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The value was written into the target.
    Applied,
    /// Optional rule whose path was missing.
    Skipped,
    /// The rule raised the error that aborted the run.
    Failed,
    /// Evaluated successfully, but never applied because the run failed.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct RuleMetrics {
    pub path: String,
    /// Time spent in path lookup, validation and transform.
    pub duration: Duration,
    pub outcome: RuleOutcome,
}

/// Timings for one execution of a rule set.
#[derive(Debug, Clone)]
pub struct ExecutionMetrics {
    pub mode: ExecutionMode,
    /// Time spent evaluating rules.
    pub evaluate: Duration,
    /// Time spent applying deferred values to the target.
    pub apply: Duration,
    /// One entry per rule that was evaluated, in rule order.
    pub rules: Vec<RuleMetrics>,
}

impl ExecutionMetrics {
    pub(crate) fn new(mode: ExecutionMode) -> Self {
        ExecutionMetrics { mode, evaluate: Duration::ZERO, apply: Duration::ZERO, rules: Vec::new() }
    }

    pub(crate) fn record(&mut self, path: &str, duration: Duration, outcome: RuleOutcome) {
        self.rules.push(RuleMetrics { path: path.to_string(), duration, outcome });
    }

    /// Number of rules with the given outcome.
    pub fn count(&self, outcome: RuleOutcome) -> usize {
        self.rules.iter().filter(|r| r.outcome == outcome).count()
    }
}
