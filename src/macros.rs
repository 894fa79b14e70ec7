// Crate-internal; reached through `#[macro_use] mod macros`.
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Implement [`NamedFields`](crate::NamedFields) for a struct by listing the
/// fields that may be written by name, with their types.
///
/// ```
/// use jsonpath_mapper::named_fields;
///
/// #[derive(Default)]
/// struct Customer {
///     name: String,
///     age: u32,
/// }
///
/// named_fields!(Customer { name: String, age: u32 });
/// ```
///
/// Each generated setter decodes the incoming JSON value into the declared
/// field type; a value of the wrong shape is refused with the decode error.
#[macro_export]
macro_rules! named_fields {
    ($target:ty { $($field:ident : $ty:ty),* $(,)? }) => {
        impl $crate::NamedFields for $target {
            fn named_setter(name: &str) -> ::std::option::Option<$crate::NamedSetter<Self>> {
                match name {
                    $(
                        stringify!($field) => ::std::option::Option::Some(::std::sync::Arc::new(
                            |target: &mut $target,
                             value: $crate::__private::Value|
                             -> ::std::result::Result<(), $crate::__private::Error> {
                                target.$field = $crate::__private::from_value::<$ty>(value)?;
                                ::std::result::Result::Ok(())
                            },
                        )),
                    )*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    fn digits() -> &'static regex::Regex {
        regex!(r"^\d+$")
    }

    #[test]
    fn regex_is_compiled_once_per_call_site() {
        assert!(std::ptr::eq(digits(), digits()));
        assert!(digits().is_match("2024"));
        assert!(!digits().is_match("20x4"));
    }
}
