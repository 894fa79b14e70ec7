//! Typed field rules.
//!
//! `FieldRule<T, S, U>` maps one document value into a target `T`:
//!
//! - `S` is the raw value type, decoded from the document with serde.
//! - `U` is the value handed to the apply strategy after the transform.
//!
//! ```text
//! path ──▶ raw Value ──decode──▶ S ──validator──▶ S ──transform──▶ U ──apply──▶ T
//! ```
//!
//! Rules are immutable. Every builder-style method consumes the rule and
//! returns a new one, so a rule can be cloned into several mappers and
//! evaluated from several threads.
//!
//! ## Binding order
//!
//! Binding a target field (`to_chain_field`, `to_getter_field`,
//! `to_named_field`) fixes `U` to the field's type and resets the transform to
//! a *cast*: the raw value is decoded directly as `U`. Call `with_transform`
//! after binding when the field needs a conversion:
//!
//! ```
//! use chrono::NaiveDate;
//! use jsonpath_mapper::FieldRule;
//! use jsonpath_mapper::rules::helpers::iso_date;
//!
//! #[derive(Default)]
//! struct Customer {
//!     created: Option<NaiveDate>,
//! }
//!
//! let rule = FieldRule::from_path("$.customer.accountCreated")
//!     .to_getter_field(|c: &mut Customer, date: NaiveDate| c.created = Some(date))
//!     .with_try_transform(|raw: String| iso_date(&raw));
//! ```
//!
//! The cast needs `U: DeserializeOwned`. Field types without serde support
//! are bound with `to_chain_field_with` / `to_getter_field_with`, which take
//! the transform that builds the value instead.

use super::named::{NamedFields, NamedSetter};
use super::{Deferred, MappingRule};
use crate::error::{MapError, Result};
use crate::path::{JsonPath, PathEvaluator, PathSyntaxError, Pointer};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type ApplyFn<T, U> = Arc<dyn Fn(T, U) -> Result<T> + Send + Sync>;
type Validator<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;
type MapFn<S, U> = Arc<dyn Fn(S) -> std::result::Result<U, String> + Send + Sync>;

enum Transform<S, U> {
    /// Decode `U` straight from the raw value.
    Cast(fn(&Value) -> serde_json::Result<U>),
    /// Convert the decoded raw value.
    Map(MapFn<S, U>),
}

impl<S, U> Clone for Transform<S, U> {
    fn clone(&self) -> Self {
        match self {
            Transform::Cast(decode) => Transform::Cast(*decode),
            Transform::Map(f) => Transform::Map(Arc::clone(f)),
        }
    }
}

impl<S, U> Transform<S, U> {
    fn map<F>(f: F) -> Self
    where
        F: Fn(S) -> U + Send + Sync + 'static,
    {
        Transform::Map(Arc::new(move |raw| Ok(f(raw))))
    }
}

fn decode<V: DeserializeOwned>(raw: &Value) -> serde_json::Result<V> {
    V::deserialize(raw)
}

/// Mapping rule for a single field.
///
/// - `T`: target type
/// - `S`: type of the raw JSON value
/// - `U`: type written into the target
pub struct FieldRule<T, S, U> {
    path: Arc<str>,
    evaluator: std::result::Result<Arc<dyn PathEvaluator>, PathSyntaxError>,
    apply: ApplyFn<T, U>,
    validator: Option<Validator<S>>,
    transform: Transform<S, U>,
    optional: bool,
}

impl<T, S, U> Clone for FieldRule<T, S, U> {
    fn clone(&self) -> Self {
        FieldRule {
            path: Arc::clone(&self.path),
            evaluator: self.evaluator.clone(),
            apply: Arc::clone(&self.apply),
            validator: self.validator.clone(),
            transform: self.transform.clone(),
            optional: self.optional,
        }
    }
}

impl<T, S, U> fmt::Debug for FieldRule<T, S, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("path", &self.path)
            .field("apply", &"<function>")
            .field("validator", &self.validator.as_ref().map(|_| "<function>"))
            .field("optional", &self.optional)
            .finish()
    }
}

impl<T, S> FieldRule<T, S, S>
where
    T: 'static,
    S: DeserializeOwned + 'static,
{
    /// Rule reading the JSONPath `path`: pass-through apply, always-true
    /// validator, identity transform, required.
    ///
    /// A path that does not compile is reported by [`MappingRule::check`]
    /// (and therefore by the mapper builder) and by every evaluation.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let evaluator = JsonPath::parse(&path).map(|p| Arc::new(p) as Arc<dyn PathEvaluator>);
        Self::with_evaluator(path, evaluator)
    }

    /// Rule reading an RFC 6901 JSON pointer such as `/customer/name`.
    pub fn from_pointer(pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        let evaluator: Arc<dyn PathEvaluator> = Arc::new(Pointer(pointer.clone()));
        Self::with_evaluator(pointer, Ok(evaluator))
    }

    /// Rule reading through a caller-supplied evaluator. `label` names the
    /// rule in errors and reports.
    pub fn from_evaluator(label: impl Into<String>, evaluator: impl PathEvaluator + 'static) -> Self {
        Self::with_evaluator(label.into(), Ok(Arc::new(evaluator)))
    }

    fn with_evaluator(
        path: String,
        evaluator: std::result::Result<Arc<dyn PathEvaluator>, PathSyntaxError>,
    ) -> Self {
        FieldRule {
            path: path.into(),
            evaluator,
            apply: Arc::new(|target, _| Ok(target)),
            validator: None,
            transform: Transform::Cast(decode::<S>),
            optional: false,
        }
    }
}

impl<T, S, U> FieldRule<T, S, U>
where
    T: 'static,
    S: 'static,
    U: 'static,
{
    fn bind<V>(self, apply: ApplyFn<T, V>, transform: Transform<S, V>) -> FieldRule<T, S, V> {
        FieldRule {
            path: self.path,
            evaluator: self.evaluator,
            apply,
            validator: self.validator,
            transform,
            optional: self.optional,
        }
    }

    fn chain_apply<V, F>(f: F) -> ApplyFn<T, V>
    where
        F: Fn(T, V) -> T + Send + Sync + 'static,
    {
        Arc::new(move |target, value| Ok(f(target, value)))
    }

    fn getter_apply<V, F>(f: F) -> ApplyFn<T, V>
    where
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Arc::new(move |mut target, value| {
            f(&mut target, value);
            Ok(target)
        })
    }

    /// Write with a functional update: `f` takes the target and returns the
    /// updated (possibly new) target.
    pub fn to_chain_field<V, F>(self, f: F) -> FieldRule<T, S, V>
    where
        V: DeserializeOwned + 'static,
        F: Fn(T, V) -> T + Send + Sync + 'static,
    {
        self.bind(Self::chain_apply(f), Transform::Cast(decode::<V>))
    }

    /// Write by mutating the target in place.
    pub fn to_getter_field<V, F>(self, f: F) -> FieldRule<T, S, V>
    where
        V: DeserializeOwned + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.bind(Self::getter_apply(f), Transform::Cast(decode::<V>))
    }

    /// Like [`to_chain_field`](Self::to_chain_field), but the field value is
    /// built by `transform` instead of decoded, so `V` needs no serde support.
    pub fn to_chain_field_with<V, M, F>(self, transform: M, f: F) -> FieldRule<T, S, V>
    where
        V: 'static,
        M: Fn(S) -> V + Send + Sync + 'static,
        F: Fn(T, V) -> T + Send + Sync + 'static,
    {
        self.bind(Self::chain_apply(f), Transform::map(transform))
    }

    /// Like [`to_getter_field`](Self::to_getter_field), but the field value is
    /// built by `transform` instead of decoded, so `V` needs no serde support.
    ///
    /// ```
    /// use jsonpath_mapper::FieldRule;
    ///
    /// struct Email(String);
    ///
    /// #[derive(Default)]
    /// struct Contact {
    ///     email: Option<Email>,
    /// }
    ///
    /// let rule = FieldRule::from_path("$.email")
    ///     .to_getter_field_with(|raw: String| Email(raw.to_lowercase()), |c: &mut Contact, e| c.email = Some(e));
    /// ```
    pub fn to_getter_field_with<V, M, F>(self, transform: M, f: F) -> FieldRule<T, S, V>
    where
        V: 'static,
        M: Fn(S) -> V + Send + Sync + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.bind(Self::getter_apply(f), Transform::map(transform))
    }

    /// Write into the field called `name`, using the setter table of `T`.
    ///
    /// The setter is looked up now; an unknown name fails here rather than
    /// on every mapping call. The mapped value is re-encoded as JSON and
    /// decoded by the setter into the field's own type.
    pub fn to_named_field<V>(self, name: &str) -> Result<FieldRule<T, S, V>>
    where
        T: NamedFields,
        V: Serialize + DeserializeOwned + 'static,
    {
        let setter: NamedSetter<T> = T::named_setter(name).ok_or_else(|| MapError::FieldAssignment {
            name: name.to_string(),
            reason: format!("{} has no settable field with this name", std::any::type_name::<T>()),
        })?;
        let name: Arc<str> = name.into();

        let apply: ApplyFn<T, V> = Arc::new(move |mut target, value: V| {
            let assignment_error = |reason: String| MapError::FieldAssignment { name: name.to_string(), reason };
            let raw = serde_json::to_value(value).map_err(|e| assignment_error(e.to_string()))?;
            setter(&mut target, raw).map_err(|e| assignment_error(e.to_string()))?;
            Ok(target)
        });
        Ok(self.bind(apply, Transform::Cast(decode::<V>)))
    }

    /// Replace the validator. A rejected value fails the mapping with
    /// [`MapError::FieldValidation`].
    pub fn with_validator<P>(self, predicate: P) -> Self
    where
        P: Fn(&S) -> bool + Send + Sync + 'static,
    {
        FieldRule { validator: Some(Arc::new(predicate)), ..self }
    }

    /// Replace the transform.
    pub fn with_transform<F>(self, f: F) -> Self
    where
        F: Fn(S) -> U + Send + Sync + 'static,
    {
        FieldRule { transform: Transform::map(f), ..self }
    }

    /// Replace the transform with a fallible one. Its error is reported as
    /// [`MapError::FieldType`].
    pub fn with_try_transform<F, E>(self, f: F) -> Self
    where
        F: Fn(S) -> std::result::Result<U, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        FieldRule { transform: Transform::Map(Arc::new(move |raw| f(raw).map_err(|e| e.to_string()))), ..self }
    }

    /// Mark the rule optional: a missing path leaves the target untouched.
    pub fn optional(self) -> Self {
        FieldRule { optional: true, ..self }
    }
}

impl<T, S, U> FieldRule<T, S, U>
where
    S: DeserializeOwned,
{
    fn decode_raw(&self, raw: &Value) -> Result<S> {
        S::deserialize(raw).map_err(|e| MapError::field_type(&self.path, e))
    }

    fn lookup<'a>(&self, document: &'a Value) -> Result<Option<Cow<'a, Value>>> {
        match &self.evaluator {
            Ok(evaluator) => Ok(evaluator.evaluate(document)),
            Err(source) => Err(MapError::InvalidPath { path: self.path.to_string(), source: source.clone() }),
        }
    }
}

impl<T, S, U> MappingRule<T> for FieldRule<T, S, U>
where
    T: 'static,
    S: DeserializeOwned + 'static,
    U: Send + 'static,
{
    fn path(&self) -> &str {
        &self.path
    }

    fn is_optional(&self) -> bool {
        self.optional
    }

    fn check(&self) -> Result<()> {
        match &self.evaluator {
            Ok(_) => Ok(()),
            Err(source) => Err(MapError::InvalidPath { path: self.path.to_string(), source: source.clone() }),
        }
    }

    fn evaluate(&self, document: &Value) -> Result<Deferred<T>> {
        let Some(raw) = self.lookup(document)? else {
            if self.optional {
                return Ok(Deferred::Skip);
            }
            return Err(MapError::FieldNotFound { path: self.path.to_string() });
        };

        let mut decoded: Option<S> = None;
        if let Some(validator) = &self.validator {
            let value = self.decode_raw(&raw)?;
            if !validator(&value) {
                return Err(MapError::FieldValidation { path: self.path.to_string() });
            }
            decoded = Some(value);
        }

        let mapped: U = match &self.transform {
            Transform::Cast(cast) => cast(&raw).map_err(|e| MapError::field_type(&self.path, e))?,
            Transform::Map(f) => {
                let value = match decoded {
                    Some(value) => value,
                    None => self.decode_raw(&raw)?,
                };
                f(value).map_err(|reason| MapError::field_type(&self.path, reason))?
            }
        };

        let apply = Arc::clone(&self.apply);
        Ok(Deferred::apply_with(move |target| apply(target, mapped)))
    }
}
