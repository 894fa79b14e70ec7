//! Declarative JSON-to-object mapping.
//!
//! A mapper is an ordered list of field rules plus a way to create an empty
//! target. Each rule reads one value from the parsed document with a JSONPath
//! expression, validates it, converts it, and writes it into the target
//! through a setter, a functional update, or a field name.
//!
//! ```
//! use chrono::NaiveDate;
//! use jsonpath_mapper::{FieldRule, JsonPathMapper};
//! use jsonpath_mapper::rules::helpers::iso_date;
//!
//! #[derive(Debug, Default)]
//! struct Customer {
//!     name: String,
//!     age: u32,
//!     created: Option<NaiveDate>,
//! }
//!
//! let mapper = JsonPathMapper::<Customer>::builder()
//!     .initialize_default()
//!     .map_field("$.customer.name", |c: &mut Customer, name: String| c.name = name)
//!     .map_rule(
//!         FieldRule::from_path("$.customer.age")
//!             .to_getter_field(|c: &mut Customer, age: u32| c.age = age)
//!             .with_validator(|age: &u32| *age > 0),
//!     )
//!     .map_rule(
//!         FieldRule::from_path("$.customer.accountCreated")
//!             .to_getter_field(|c: &mut Customer, d: NaiveDate| c.created = Some(d))
//!             .with_try_transform(|raw: String| iso_date(&raw))
//!             .optional(),
//!     )
//!     .build()?;
//!
//! let customer = mapper.map(r#"{"customer": {"name": "Jan", "age": 18}}"#)?;
//! assert_eq!(customer.name, "Jan");
//! assert_eq!(customer.created, None);
//! # Ok::<(), jsonpath_mapper::MapError>(())
//! ```
//!
//! ## Layout
//!
//! - `path`: JSONPath compilation and evaluation.
//! - `rules`: `FieldRule`, the type-erased `MappingRule`, by-name setters and
//!   ready-made transforms.
//! - `engine`: sequential and independent execution of a rule set.
//! - `builder` / `api`: `MapperBuilder` and `JsonPathMapper`.
//!
//! Rule outcomes and timings are logged through the `log` facade; install any
//! logger (the CLI uses `env_logger`) to see them.

#[macro_use]
mod macros;
mod api;
mod builder;
mod engine;
mod error;
mod path;
pub mod rules;

pub use api::{JsonPathMapper, MapMetrics, MapRun};
pub use builder::MapperBuilder;
pub use engine::{ExecutionMetrics, ExecutionMode, RuleMetrics, RuleOutcome};
pub use error::{MapError, Result};
pub use path::{JsonPath, PathEvaluator, PathSyntaxError, Pointer};
pub use rules::field::FieldRule;
pub use rules::named::{NamedFields, NamedSetter};
pub use rules::{Deferred, MappingRule};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Error, Value, from_value};
}
