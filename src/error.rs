//! Error types for mapping runs.
//!
//! Every failure aborts the current `map` call; nothing is retried and no
//! partially mapped target is handed back. The only condition that is *not*
//! an error is a missing path on a rule marked `optional()`.

use crate::path::PathSyntaxError;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = MapError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MapError {
    /// The input text is not well-formed JSON. Raised before any rule runs.
    #[error("wrong json format: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    /// A rule path could not be compiled.
    #[error("invalid json path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathSyntaxError,
    },

    /// A required rule path resolved to nothing.
    #[error("wrong field path: {path}")]
    FieldNotFound { path: String },

    /// The resolved value was rejected by the rule's validator.
    #[error("validator rejected value for path: {path}")]
    FieldValidation { path: String },

    /// The resolved value has the wrong shape for the rule's value types, or
    /// the rule's transform failed.
    #[error("wrong type of json field at {path}: {reason}")]
    FieldType { path: String, reason: String },

    /// A by-name setter does not exist or refused the value.
    #[error("cannot set value to field '{name}': {reason}")]
    FieldAssignment { name: String, reason: String },

    /// The builder was finalized without a way to create target instances.
    #[error("cannot create new instance of {target}: no initializer configured")]
    NoInitializer { target: &'static str },

    /// A dedicated worker pool was requested with zero threads.
    #[error("worker pool needs at least one thread, got {threads}")]
    InvalidThreadCount { threads: usize },

    /// The dedicated worker pool for independent mode could not be started.
    #[error("failed to start mapping worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl MapError {
    /// Path of the rule that failed, when the error is tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            MapError::InvalidPath { path, .. }
            | MapError::FieldNotFound { path }
            | MapError::FieldValidation { path }
            | MapError::FieldType { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn field_type(path: &str, reason: impl ToString) -> Self {
        MapError::FieldType { path: path.to_string(), reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_path() {
        let err = MapError::FieldNotFound { path: "$.wrong.path".to_string() };
        assert_eq!(err.to_string(), "wrong field path: $.wrong.path");
        assert_eq!(err.path(), Some("$.wrong.path"));

        let err = MapError::field_type("$.customer.name", "invalid type: string \"Jan\", expected u32");
        assert!(err.to_string().contains("$.customer.name"));
        assert!(err.to_string().contains("expected u32"));
    }

    #[test]
    fn errors_without_a_rule_have_no_path() {
        let err = MapError::NoInitializer { target: "Customer" };
        assert_eq!(err.path(), None);
        assert!(err.to_string().contains("Customer"));
    }
}
