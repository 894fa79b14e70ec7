//! Field-mapping rules.
//!
//! A rule is the atomic mapping unit: it reads one value from the document,
//! checks it, converts it, and knows how to fold it into the target. Running a
//! rule is split in two so that the read side can run on any worker while the
//! write side stays on the caller's thread:
//!
//! ```text
//! document ── evaluate() ──▶ Deferred<T> ── apply(target) ──▶ target'
//!             (path, validate,              (apply strategy,
//!              transform)                    list order)
//! ```
//!
//! [`field::FieldRule`] is the typed rule users build; [`MappingRule`] is its
//! type-erased face that the engine stores in a rule set.

pub mod field;
pub mod helpers;
pub mod named;

#[cfg(test)]
mod tests;

use crate::error::Result;
use serde_json::Value;

type ApplyOnce<T> = Box<dyn FnOnce(T) -> Result<T> + Send>;

/// The result of evaluating a rule against a document, not yet applied.
pub enum Deferred<T> {
    /// An optional rule whose path was missing. Applying it returns the
    /// target unchanged.
    Skip,
    /// A resolved, validated and transformed value waiting to be written.
    Apply(ApplyOnce<T>),
}

impl<T> Deferred<T> {
    pub(crate) fn apply_with<F>(f: F) -> Self
    where
        F: FnOnce(T) -> Result<T> + Send + 'static,
    {
        Deferred::Apply(Box::new(f))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Deferred::Skip)
    }

    /// Fold the deferred value into `target`.
    pub fn apply(self, target: T) -> Result<T> {
        match self {
            Deferred::Skip => Ok(target),
            Deferred::Apply(f) => f(target),
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deferred::Skip => f.write_str("Skip"),
            Deferred::Apply(_) => f.write_str("Apply(<function>)"),
        }
    }
}

/// A rule as seen by the engine: the value types are hidden, only the target
/// type remains.
///
/// Implementations must not keep mutable state: `evaluate` may run on several
/// workers at once for different rules of the same set.
pub trait MappingRule<T>: Send + Sync {
    /// The path expression this rule reads.
    fn path(&self) -> &str;

    fn is_optional(&self) -> bool;

    /// Report configuration problems (an uncompilable path) before any
    /// document is seen.
    fn check(&self) -> Result<()>;

    /// Read, validate and transform this rule's value from `document`.
    fn evaluate(&self, document: &Value) -> Result<Deferred<T>>;
}
