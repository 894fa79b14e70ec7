//! Mapper assembly.
//!
//! `MapperBuilder` collects an initializer and an ordered list of rules, then
//! freezes them into a [`JsonPathMapper`]. Rule order is application order.
//!
//! Configuration mistakes (unknown named field, path that does not compile,
//! missing initializer) are collected while chaining and reported once by
//! `build`, so the fluent chain never has to be broken up with `?`.

use crate::api::JsonPathMapper;
use crate::engine::{Initializer, RuleSet};
use crate::error::{MapError, Result};
use crate::rules::MappingRule;
use crate::rules::field::FieldRule;
use crate::rules::named::NamedFields;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub struct MapperBuilder<T> {
    initializer: Option<Initializer<T>>,
    rules: Vec<Arc<dyn MappingRule<T>>>,
    threads: Option<usize>,
    config_error: Option<MapError>,
}

impl<T: 'static> Default for MapperBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MapperBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperBuilder")
            .field("initialized", &self.initializer.is_some())
            .field("rules", &self.rules.iter().map(|r| r.path()).collect::<Vec<_>>())
            .field("threads", &self.threads)
            .field("config_error", &self.config_error)
            .finish()
    }
}

impl<T: 'static> MapperBuilder<T> {
    pub fn new() -> Self {
        MapperBuilder { initializer: None, rules: Vec::new(), threads: None, config_error: None }
    }

    /// Set the function that creates a fresh target for every mapping call.
    pub fn initialize<F>(mut self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(f));
        self
    }

    /// Use `T::default()` as the initializer.
    pub fn initialize_default(self) -> Self
    where
        T: Default,
    {
        self.initialize(T::default)
    }

    /// Append a fully configured rule.
    pub fn map_rule<R>(mut self, rule: R) -> Self
    where
        R: MappingRule<T> + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Append a rule that was already shared with other mappers.
    pub fn map_shared_rule(mut self, rule: Arc<dyn MappingRule<T>>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Required field written through a mutating setter.
    pub fn map_field<V, F>(self, path: impl Into<String>, setter: F) -> Self
    where
        V: DeserializeOwned + Send + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.map_rule(FieldRule::<T, Value, Value>::from_path(path).to_getter_field(setter))
    }

    /// Optional field written through a mutating setter.
    pub fn map_optional_field<V, F>(self, path: impl Into<String>, setter: F) -> Self
    where
        V: DeserializeOwned + Send + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.map_rule(FieldRule::<T, Value, Value>::from_path(path).to_getter_field(setter).optional())
    }

    /// Required field whose value is built by `transform` from the raw value
    /// decoded as `S`. The field type needs no serde support.
    pub fn map_field_with<S, V, M, F>(self, path: impl Into<String>, transform: M, setter: F) -> Self
    where
        S: DeserializeOwned + 'static,
        V: Send + 'static,
        M: Fn(S) -> V + Send + Sync + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.map_rule(FieldRule::<T, S, S>::from_path(path).to_getter_field_with(transform, setter))
    }

    /// Required field written through a functional update.
    pub fn map_chain_field<V, F>(self, path: impl Into<String>, update: F) -> Self
    where
        V: DeserializeOwned + Send + 'static,
        F: Fn(T, V) -> T + Send + Sync + 'static,
    {
        self.map_rule(FieldRule::<T, Value, Value>::from_path(path).to_chain_field(update))
    }

    /// Optional field written through a functional update.
    pub fn map_optional_chain_field<V, F>(self, path: impl Into<String>, update: F) -> Self
    where
        V: DeserializeOwned + Send + 'static,
        F: Fn(T, V) -> T + Send + Sync + 'static,
    {
        self.map_rule(FieldRule::<T, Value, Value>::from_path(path).to_chain_field(update).optional())
    }

    /// Required field written into the field called `name`.
    pub fn map_named_field(self, path: impl Into<String>, name: &str) -> Self
    where
        T: NamedFields,
    {
        self.push_named(path.into(), name, false)
    }

    /// Optional field written into the field called `name`.
    pub fn map_optional_named_field(self, path: impl Into<String>, name: &str) -> Self
    where
        T: NamedFields,
    {
        self.push_named(path.into(), name, true)
    }

    fn push_named(mut self, path: String, name: &str, optional: bool) -> Self
    where
        T: NamedFields,
    {
        // The raw value is passed through untouched; the setter decodes it
        // into the field's own type.
        match FieldRule::<T, Value, Value>::from_path(path).to_named_field::<Value>(name) {
            Ok(rule) if optional => self.map_rule(rule.optional()),
            Ok(rule) => self.map_rule(rule),
            Err(err) => {
                log::warn!("[builder] rejected named field \"{name}\": {err}");
                if self.config_error.is_none() {
                    self.config_error = Some(err);
                }
                self
            }
        }
    }

    /// Evaluate independent-mode rules on a dedicated pool of `threads`
    /// workers instead of rayon's global pool. Zero is rejected by `build`.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Freeze the configuration into a mapper.
    pub fn build(self) -> Result<JsonPathMapper<T>> {
        let initializer = match self.initializer {
            Some(initializer) => initializer,
            None => return Err(MapError::NoInitializer { target: std::any::type_name::<T>() }),
        };
        if let Some(err) = self.config_error {
            return Err(err);
        }
        for rule in &self.rules {
            rule.check()?;
        }

        let pool = match self.threads {
            Some(0) => return Err(MapError::InvalidThreadCount { threads: 0 }),
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("jsonpath-mapper-{i}"))
                    .build()?,
            )),
            None => None,
        };

        log::debug!(
            "[builder] target={} rules={} threads={:?}",
            std::any::type_name::<T>(),
            self.rules.len(),
            self.threads
        );
        Ok(JsonPathMapper::from_rule_set(RuleSet::new(initializer, self.rules, pool)))
    }

    /// Freeze the configuration into a mapper whose every result goes through
    /// `transform`. Typical use is finishing a builder-style target.
    pub fn build_with_result_transform<R, F>(self, transform: F) -> Result<JsonPathMapper<R>>
    where
        R: 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Ok(self.build()?.with_result_transform(transform))
    }
}
