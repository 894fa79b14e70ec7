//! Writing fields by name.
//!
//! Instead of looking fields up reflectively on every call, a target type
//! publishes a table of setters keyed by field name. Rules resolve their setter
//! once, when they are built, so a misspelt name is a configuration error
//! reported by the builder.
//!
//! Use [`named_fields!`](crate::named_fields) to implement the trait.

use serde_json::Value;
use std::sync::Arc;

/// Setter for one named field. Receives the mapped value as JSON and decodes
/// it into the field's type.
pub type NamedSetter<T> = Arc<dyn Fn(&mut T, Value) -> Result<(), serde_json::Error> + Send + Sync>;

pub trait NamedFields: Sized {
    /// The setter for `name`, or `None` when the type has no such field.
    fn named_setter(name: &str) -> Option<NamedSetter<Self>>;

    /// Every name accepted by [`named_setter`](Self::named_setter).
    fn field_names() -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        owner: String,
        balance: i64,
        tags: Vec<String>,
    }

    crate::named_fields!(Account { owner: String, balance: i64, tags: Vec<String> });

    #[test]
    fn setters_decode_into_field_types() {
        let mut account = Account::default();
        Account::named_setter("owner").unwrap()(&mut account, json!("Jan")).unwrap();
        Account::named_setter("balance").unwrap()(&mut account, json!(-40)).unwrap();
        Account::named_setter("tags").unwrap()(&mut account, json!(["vip"])).unwrap();

        assert_eq!(account, Account { owner: "Jan".into(), balance: -40, tags: vec!["vip".into()] });
    }

    #[test]
    fn unknown_names_have_no_setter() {
        assert!(Account::named_setter("surname").is_none());
        assert_eq!(Account::field_names(), &["owner", "balance", "tags"]);
    }

    #[test]
    fn setter_refuses_wrong_shape() {
        let mut account = Account::default();
        let err = Account::named_setter("balance").unwrap()(&mut account, json!("lots")).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
        assert_eq!(account.balance, 0);
    }
}
