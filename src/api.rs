use crate::builder::MapperBuilder;
use crate::engine::{ExecutionMetrics, ExecutionMode, ExecutionRun, RuleSet};
use crate::error::{MapError, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Something that turns a parsed document into a `T`. Implemented by the rule
/// set itself and by the result-transforming wrapper.
trait Pipeline<T>: Send + Sync {
    fn run(&self, document: &Value, mode: ExecutionMode) -> ExecutionRun<T>;
    fn paths(&self) -> Vec<&str>;
}

impl<T: 'static> Pipeline<T> for RuleSet<T> {
    fn run(&self, document: &Value, mode: ExecutionMode) -> ExecutionRun<T> {
        self.execute_with_metrics(document, mode)
    }

    fn paths(&self) -> Vec<&str> {
        self.rules().iter().map(|rule| rule.path()).collect()
    }
}

/// A mapper whose result is post-processed by `transform`.
struct Transformed<T, R> {
    inner: Arc<dyn Pipeline<T>>,
    transform: Arc<dyn Fn(T) -> R + Send + Sync>,
}

impl<T, R> Pipeline<R> for Transformed<T, R> {
    fn run(&self, document: &Value, mode: ExecutionMode) -> ExecutionRun<R> {
        let ExecutionRun { result, metrics } = self.inner.run(document, mode);
        ExecutionRun { result: result.map(|value| (self.transform)(value)), metrics }
    }

    fn paths(&self) -> Vec<&str> {
        self.inner.paths()
    }
}

/// Maps JSON text to `T`.
///
/// Create one with [`JsonPathMapper::builder`]. A mapper is immutable, cheap to
/// clone, and can be used from any number of threads at once; each call parses
/// its own document and creates its own target.
pub struct JsonPathMapper<T> {
    pipeline: Arc<dyn Pipeline<T>>,
}

impl<T> Clone for JsonPathMapper<T> {
    fn clone(&self) -> Self {
        JsonPathMapper { pipeline: Arc::clone(&self.pipeline) }
    }
}

impl<T> fmt::Debug for JsonPathMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPathMapper").field("paths", &self.pipeline.paths()).finish()
    }
}

/// Result of [`JsonPathMapper::map_verbose`]: the mapping outcome and the
/// timings recorded while producing it, failed runs included.
#[derive(Debug)]
pub struct MapRun<T> {
    pub result: Result<T>,
    pub metrics: MapMetrics,
}

/// Timings for a whole mapping call.
#[derive(Debug, Clone)]
pub struct MapMetrics {
    /// Total elapsed time, parsing included.
    pub total: Duration,
    /// Time spent parsing the input text.
    pub parse: Duration,
    /// Rule evaluation and application details.
    pub execution: ExecutionMetrics,
}

impl<T: 'static> JsonPathMapper<T> {
    /// Start assembling a mapper for `T`.
    pub fn builder() -> MapperBuilder<T> {
        MapperBuilder::new()
    }

    pub(crate) fn from_rule_set(rule_set: RuleSet<T>) -> Self {
        JsonPathMapper { pipeline: Arc::new(rule_set) }
    }

    /// Wrap this mapper so that every result goes through `transform`.
    pub(crate) fn with_result_transform<R, F>(self, transform: F) -> JsonPathMapper<R>
    where
        R: 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        JsonPathMapper { pipeline: Arc::new(Transformed { inner: self.pipeline, transform: Arc::new(transform) }) }
    }

    /// Map `text`, applying rules one after another in list order.
    pub fn map(&self, text: &str) -> Result<T> {
        self.map_value(&parse_document(text)?, ExecutionMode::Sequential)
    }

    /// Map `text`, evaluating rules concurrently and applying them in list
    /// order. Rules must not depend on each other's effects.
    pub fn map_concurrently(&self, text: &str) -> Result<T> {
        self.map_value(&parse_document(text)?, ExecutionMode::Independent)
    }

    /// Map an already parsed document.
    pub fn map_value(&self, document: &Value, mode: ExecutionMode) -> Result<T> {
        self.pipeline.run(document, mode).result
    }

    /// Map `text` and also return timing details.
    ///
    /// This is useful for profiling and rule debugging; the plain [`map`]
    /// entry points discard these numbers. Metrics are returned for failed
    /// runs too, with the failing rule marked [`RuleOutcome::Failed`]. When
    /// the text is not JSON no rule runs and the rule list is empty.
    ///
    /// [`map`]: JsonPathMapper::map
    /// [`RuleOutcome::Failed`]: crate::RuleOutcome::Failed
    pub fn map_verbose(&self, text: &str, mode: ExecutionMode) -> MapRun<T> {
        let total_start = Instant::now();
        let parsed = parse_document(text);
        let parse = total_start.elapsed();

        let (result, execution) = match parsed {
            Ok(document) => {
                let ExecutionRun { result, metrics } = self.pipeline.run(&document, mode);
                (result, metrics)
            }
            Err(err) => (Err(err), ExecutionMetrics::new(mode)),
        };

        MapRun { result, metrics: MapMetrics { total: total_start.elapsed(), parse, execution } }
    }

    /// Number of rules in this mapper.
    pub fn rule_count(&self) -> usize {
        self.pipeline.paths().len()
    }

    /// Rule paths in application order.
    pub fn paths(&self) -> Vec<String> {
        self.pipeline.paths().into_iter().map(str::to_string).collect()
    }
}

fn parse_document(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|source| MapError::Parse { source })
}
