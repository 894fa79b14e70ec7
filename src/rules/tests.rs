use super::field::FieldRule;
use super::helpers::{iso_date, non_empty, positive};
use super::{Deferred, MappingRule};
use crate::error::MapError;
use crate::path::{JsonPath, PathEvaluator};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    id: u64,
    customer: String,
    placed: Option<NaiveDate>,
    total_cents: i64,
    lines: Vec<String>,
}

crate::named_fields!(Order { id: u64, customer: String, total_cents: i64, lines: Vec<String> });

fn document() -> Value {
    json!({
        "order": {
            "id": 42,
            "customer": "  Jan Kowalski ",
            "placed": "2024-03-01",
            "total": 19.99,
            "note": null,
            "lines": [
                {"sku": "A-1", "qty": 2},
                {"sku": "B-7", "qty": 1}
            ]
        }
    })
}

fn apply(rule: &dyn MappingRule<Order>, target: Order) -> crate::Result<Order> {
    rule.evaluate(&document())?.apply(target)
}

#[test]
fn cast_into_bound_field() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.id").to_getter_field(|o: &mut Order, id: u64| o.id = id);
    assert_eq!(apply(&rule, Order::default()).unwrap().id, 42);
}

#[test]
fn validator_then_transform() {
    let rule = FieldRule::from_path("$.order.customer")
        .to_chain_field(|o: Order, customer: String| Order { customer, ..o })
        .with_validator(|raw: &String| non_empty(raw))
        .with_transform(|raw: String| raw.trim().to_string());

    assert_eq!(apply(&rule, Order::default()).unwrap().customer, "Jan Kowalski");
}

#[test]
fn transform_changes_value_type() {
    let rule = FieldRule::from_path("$.order.total")
        .to_getter_field(|o: &mut Order, cents: i64| o.total_cents = cents)
        .with_validator(|total: &f64| positive(total))
        .with_transform(|total: f64| (total * 100.0).round() as i64);

    assert_eq!(apply(&rule, Order::default()).unwrap().total_cents, 1999);
}

#[test]
fn fallible_transform_reports_type_error() {
    let rule = FieldRule::from_path("$.order.customer")
        .to_getter_field(|o: &mut Order, date: NaiveDate| o.placed = Some(date))
        .with_try_transform(|raw: String| iso_date(&raw));

    match rule.evaluate(&document()) {
        Err(MapError::FieldType { path, reason }) => {
            assert_eq!(path, "$.order.customer");
            assert!(!reason.is_empty());
        }
        other => panic!("expected a type error, got {other:?}"),
    }

    let ok = FieldRule::from_path("$.order.placed")
        .to_getter_field(|o: &mut Order, date: NaiveDate| o.placed = Some(date))
        .with_try_transform(|raw: String| iso_date(&raw));
    assert_eq!(apply(&ok, Order::default()).unwrap().placed, NaiveDate::from_ymd_opt(2024, 3, 1));
}

#[test]
fn rejected_value_skips_transform() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let rule = FieldRule::from_path("$.order.id")
        .to_getter_field(|o: &mut Order, id: u64| o.id = id)
        .with_transform(move |id: u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            id
        })
        .with_validator(|id: &u64| *id > 100);

    assert!(matches!(rule.evaluate(&document()), Err(MapError::FieldValidation { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn validator_type_mismatch_is_a_type_error() {
    let rule = FieldRule::from_path("$.order.customer")
        .to_getter_field(|o: &mut Order, customer: String| o.customer = customer)
        .with_validator(|n: &i64| *n > 0);

    assert!(matches!(rule.evaluate(&document()), Err(MapError::FieldType { .. })));
}

#[test]
fn required_missing_path() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.coupon")
        .to_getter_field(|o: &mut Order, c: String| o.customer = c);

    assert!(!rule.is_optional());
    assert!(matches!(rule.evaluate(&document()), Err(MapError::FieldNotFound { ref path }) if path == "$.order.coupon"));
}

#[test]
fn optional_missing_path_is_skipped() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.coupon")
        .to_getter_field(|o: &mut Order, c: String| o.customer = c)
        .optional();

    let deferred = rule.evaluate(&document()).unwrap();
    assert!(deferred.is_skip());
    let original = Order { id: 7, ..Order::default() };
    assert_eq!(deferred.apply(original.clone()).unwrap(), original);
}

#[test]
fn explicit_null_counts_as_found() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.note")
        .to_getter_field(|o: &mut Order, note: Option<String>| o.customer = note.unwrap_or_else(|| "-".into()))
        .optional();

    let deferred = rule.evaluate(&document()).unwrap();
    assert!(!deferred.is_skip());
    assert_eq!(deferred.apply(Order::default()).unwrap().customer, "-");
}

#[test]
fn indefinite_path_yields_array() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.lines[*].sku")
        .to_getter_field(|o: &mut Order, skus: Vec<String>| o.lines = skus);
    assert_eq!(apply(&rule, Order::default()).unwrap().lines, vec!["A-1", "B-7"]);

    let none = FieldRule::<Order, Value, Value>::from_path("$..price")
        .to_getter_field(|o: &mut Order, prices: Vec<f64>| o.total_cents = prices.len() as i64);
    assert_eq!(apply(&none, Order { total_cents: 9, ..Order::default() }).unwrap().total_cents, 0);
}

#[test]
fn pointer_rule() {
    let rule = FieldRule::<Order, Value, Value>::from_pointer("/order/lines/1/sku")
        .to_getter_field(|o: &mut Order, sku: String| o.lines.push(sku));
    assert_eq!(rule.path(), "/order/lines/1/sku");
    assert_eq!(apply(&rule, Order::default()).unwrap().lines, vec!["B-7"]);
}

#[derive(Debug)]
struct LineCount;

impl PathEvaluator for LineCount {
    fn evaluate<'a>(&self, document: &'a Value) -> Option<Cow<'a, Value>> {
        let lines = document.pointer("/order/lines")?.as_array()?;
        Some(Cow::Owned(json!(lines.len())))
    }
}

#[test]
fn custom_evaluator_rule() {
    let rule = FieldRule::<Order, Value, Value>::from_evaluator("line count", LineCount)
        .to_getter_field(|o: &mut Order, n: u64| o.id = n);
    assert_eq!(rule.path(), "line count");
    assert_eq!(apply(&rule, Order::default()).unwrap().id, 2);
}

#[test]
fn named_field_rules() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.lines[*].sku")
        .to_named_field::<Vec<String>>("lines")
        .unwrap();
    assert_eq!(apply(&rule, Order::default()).unwrap().lines, vec!["A-1", "B-7"]);

    let err = FieldRule::<Order, Value, Value>::from_path("$.order.placed").to_named_field::<String>("placed").unwrap_err();
    assert!(matches!(err, MapError::FieldAssignment { ref name, .. } if name == "placed"));
}

#[test]
fn invalid_path_is_reported_by_check_and_evaluate() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order[?(@.id == 1)]")
        .to_getter_field(|o: &mut Order, id: u64| o.id = id);

    assert!(matches!(rule.check(), Err(MapError::InvalidPath { .. })));
    assert!(matches!(rule.evaluate(&document()), Err(MapError::InvalidPath { .. })));
    assert!(JsonPath::parse("$.order.id").is_ok());
}

#[test]
fn rules_are_reusable_and_cloneable() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.id").to_getter_field(|o: &mut Order, id: u64| o.id = id);
    let copy = rule.clone().optional();

    assert!(!rule.is_optional());
    assert!(copy.is_optional());
    for _ in 0..3 {
        assert_eq!(apply(&rule, Order::default()).unwrap().id, 42);
    }
    assert!(format!("{copy:?}").contains("$.order.id"));
}

#[test]
fn deferred_is_debuggable() {
    let rule = FieldRule::<Order, Value, Value>::from_path("$.order.id").to_getter_field(|o: &mut Order, id: u64| o.id = id);
    let deferred: Deferred<Order> = rule.evaluate(&document()).unwrap();
    assert_eq!(format!("{deferred:?}"), "Apply(<function>)");
    assert_eq!(format!("{:?}", Deferred::<Order>::Skip), "Skip");
}

// No serde impls on purpose: the value only exists through a transform.
#[derive(Debug, Clone, PartialEq)]
struct Email(String);

#[derive(Debug, Default, Clone, PartialEq)]
struct Contact {
    primary: Option<Email>,
    backup: Option<Email>,
}

#[test]
fn transform_builds_field_without_serde_support() {
    let doc = json!({"contact": {"primary": "Jan@Example.com", "backup": "not-an-email"}});

    let primary = FieldRule::from_path("$.contact.primary")
        .to_getter_field_with(|raw: String| Email(raw.to_lowercase()), |c: &mut Contact, e| c.primary = Some(e))
        .with_validator(|raw: &String| raw.contains('@'));
    let contact = primary.evaluate(&doc).unwrap().apply(Contact::default()).unwrap();
    assert_eq!(contact.primary, Some(Email("jan@example.com".into())));

    let backup = FieldRule::from_path("$.contact.backup")
        .to_chain_field_with(Email, |c: Contact, e| Contact { backup: Some(e), ..c })
        .with_try_transform(|raw: String| if raw.contains('@') { Ok(Email(raw)) } else { Err("missing '@'") });
    match backup.evaluate(&doc) {
        Err(MapError::FieldType { path, reason }) => {
            assert_eq!(path, "$.contact.backup");
            assert_eq!(reason, "missing '@'");
        }
        other => panic!("expected a type error, got {other:?}"),
    }
}
