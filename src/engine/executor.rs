//! Rule set executor.
//!
//! `RuleSet` bundles what a mapping run needs besides the document: the target
//! initializer, the ordered rules, and optionally a dedicated worker pool for
//! independent mode. It is immutable and may be shared between threads; each
//! run creates its own target.
//!
//! ## Failure handling
//!
//! - Sequential: the first failing rule stops the run; later rules are never
//!   evaluated.
//! - Independent: every rule is evaluated. If any evaluation failed, the error
//!   of the failing rule that comes first in list order is returned and no
//!   deferred value is applied.
//!
//! No partial target ever leaves the executor.

use super::metrics::{ExecutionMetrics, RuleOutcome};
use crate::error::{MapError, Result};
use crate::rules::{Deferred, MappingRule};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Creates a fresh target for every run.
pub type Initializer<T> = Arc<dyn Fn() -> T + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// Evaluate and apply each rule in list order before moving on.
    #[default]
    Sequential,
    /// Evaluate all rules concurrently, then apply in list order.
    Independent,
}

/// Executor output bundled with timing information.
#[derive(Debug)]
pub struct ExecutionRun<T> {
    pub result: Result<T>,
    pub metrics: ExecutionMetrics,
}

type Evaluated<T> = (Result<Deferred<T>>, Duration);

pub struct RuleSet<T> {
    initializer: Initializer<T>,
    rules: Vec<Arc<dyn MappingRule<T>>>,
    pool: Option<Arc<ThreadPool>>,
}

impl<T> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("initializer", &"<function>")
            .field("rules", &self.rules.iter().map(|r| r.path()).collect::<Vec<_>>())
            .field("pool_threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

impl<T: 'static> RuleSet<T> {
    /// Bundle `rules` with `initializer`. When `pool` is `None`, independent
    /// mode runs on rayon's global pool.
    pub fn new(
        initializer: Initializer<T>,
        rules: Vec<Arc<dyn MappingRule<T>>>,
        pool: Option<Arc<ThreadPool>>,
    ) -> Self {
        RuleSet { initializer, rules, pool }
    }

    pub fn rules(&self) -> &[Arc<dyn MappingRule<T>>] {
        &self.rules
    }

    /// Map `document` into a new target and report per-rule timings.
    pub fn execute_with_metrics(&self, document: &Value, mode: ExecutionMode) -> ExecutionRun<T> {
        let run = match mode {
            ExecutionMode::Sequential => self.run_sequential(document),
            ExecutionMode::Independent => self.run_independent(document),
        };

        log::debug!(
            "[run] mode={:?} rules={} ok={} evaluate={:?} apply={:?}",
            mode,
            self.rules.len(),
            run.result.is_ok(),
            run.metrics.evaluate,
            run.metrics.apply
        );
        run
    }

    fn run_sequential(&self, document: &Value) -> ExecutionRun<T> {
        let mut metrics = ExecutionMetrics::new(ExecutionMode::Sequential);
        let mut target = (self.initializer)();

        for rule in &self.rules {
            let start = Instant::now();
            let evaluated = rule.evaluate(document);
            let duration = start.elapsed();
            metrics.evaluate += duration;

            let deferred = match evaluated {
                Ok(deferred) => deferred,
                Err(err) => return Self::abort(metrics, rule.as_ref(), duration, err),
            };

            let skipped = deferred.is_skip();
            let apply_start = Instant::now();
            let applied = deferred.apply(target);
            metrics.apply += apply_start.elapsed();

            target = match applied {
                Ok(next) => next,
                Err(err) => return Self::abort(metrics, rule.as_ref(), duration, err),
            };
            Self::record_success(&mut metrics, rule.as_ref(), duration, skipped);
        }

        ExecutionRun { result: Ok(target), metrics }
    }

    fn run_independent(&self, document: &Value) -> ExecutionRun<T> {
        let mut metrics = ExecutionMetrics::new(ExecutionMode::Independent);

        let fan_out_start = Instant::now();
        let evaluated = self.fan_out(document);
        metrics.evaluate = fan_out_start.elapsed();

        // Nothing is applied unless every evaluation succeeded.
        let any_failed = evaluated.iter().any(|(result, _)| result.is_err());
        let mut target = if any_failed { None } else { Some((self.initializer)()) };
        let mut error: Option<MapError> = None;

        let apply_start = Instant::now();
        for (rule, (result, duration)) in self.rules.iter().zip(evaluated) {
            match (result, target.take()) {
                (Err(err), _) => {
                    log::debug!("[rule:failed] path=\"{}\" error=\"{}\"", rule.path(), err);
                    metrics.record(rule.path(), duration, RuleOutcome::Failed);
                    if error.is_none() {
                        error = Some(err);
                    }
                }
                (Ok(_), None) => metrics.record(rule.path(), duration, RuleOutcome::Discarded),
                (Ok(deferred), Some(current)) => {
                    let skipped = deferred.is_skip();
                    match deferred.apply(current) {
                        Ok(next) => {
                            target = Some(next);
                            Self::record_success(&mut metrics, rule.as_ref(), duration, skipped);
                        }
                        Err(err) => {
                            log::debug!("[rule:failed] path=\"{}\" error=\"{}\"", rule.path(), err);
                            metrics.record(rule.path(), duration, RuleOutcome::Failed);
                            error = Some(err);
                        }
                    }
                }
            }
        }
        metrics.apply = apply_start.elapsed();

        let result = match error {
            Some(err) => Err(err),
            None => Ok(target.unwrap_or_else(|| (self.initializer)())),
        };
        ExecutionRun { result, metrics }
    }

    /// Evaluate every rule on the worker pool. The output keeps rule order.
    fn fan_out(&self, document: &Value) -> Vec<Evaluated<T>> {
        let rules = &self.rules;
        let evaluate = || {
            rules
                .par_iter()
                .map(|rule| {
                    let start = Instant::now();
                    let result = rule.evaluate(document);
                    (result, start.elapsed())
                })
                .collect::<Vec<_>>()
        };

        match &self.pool {
            Some(pool) => pool.install(evaluate),
            None => evaluate(),
        }
    }

    fn record_success(metrics: &mut ExecutionMetrics, rule: &dyn MappingRule<T>, duration: Duration, skipped: bool) {
        if skipped {
            log::debug!("[rule:skipped] path=\"{}\" (optional, not found)", rule.path());
            metrics.record(rule.path(), duration, RuleOutcome::Skipped);
        } else {
            log::debug!("[rule:applied] path=\"{}\" took={:?}", rule.path(), duration);
            metrics.record(rule.path(), duration, RuleOutcome::Applied);
        }
    }

    fn abort(
        mut metrics: ExecutionMetrics,
        rule: &dyn MappingRule<T>,
        duration: Duration,
        err: MapError,
    ) -> ExecutionRun<T> {
        log::debug!("[rule:failed] path=\"{}\" error=\"{}\"", rule.path(), err);
        metrics.record(rule.path(), duration, RuleOutcome::Failed);
        ExecutionRun { result: Err(err), metrics }
    }
}
