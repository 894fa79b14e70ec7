//! Rule set execution.
//!
//! The engine turns a parsed document plus an ordered rule set into a target
//! value. It is shared by every public mapping entry point; the mapper only
//! adds parsing and result post-processing around it.
//!
//! ## Execution modes
//!
//! ```text
//! Sequential                      Independent
//! ──────────                      ───────────
//! target = init()                 ┌ rule[0].evaluate(doc) ┐
//! for rule in rules:              ├ rule[1].evaluate(doc) ┤  rayon workers,
//!   d = rule.evaluate(doc)        ├        ...            ┤  any order
//!   target = d.apply(target)      └ rule[n].evaluate(doc) ┘
//!                                            │ join (list order kept)
//!                                            v
//!                                 first error by list order? -> fail
//!                                 target = init()
//!                                 for d in deferred: target = d.apply(target)
//! ```
//!
//! Both modes apply in list order, so for rules that do not depend on each
//! other the result is the same. Sequential mode additionally lets a rule see
//! what earlier rules wrote, because evaluation and application interleave.
//!
//! ## Responsibilities by module
//!
//! - `executor.rs`: `RuleSet`, the two execution strategies and the worker pool.
//! - `metrics.rs`: per-run and per-rule timings and outcomes.
//!
//! ## Debugging
//!
//! Rule outcomes are logged at `debug` level through the `log` facade
//! (`[rule:applied]`, `[rule:skipped]`, `[rule:failed]`, `[run]`).

#[path = "engine/executor.rs"]
mod executor;
#[path = "engine/metrics.rs"]
mod metrics;

pub use executor::{ExecutionMode, ExecutionRun, Initializer, RuleSet};
pub use metrics::{ExecutionMetrics, RuleMetrics, RuleOutcome};
