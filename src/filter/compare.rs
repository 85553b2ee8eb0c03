//! Value comparisons behind the metadata operators.

use std::cmp::Ordering;

use crate::parser::Value;

/// Numbers are equal when their `f64` bits are, so `0.0 != -0.0` and a NaN
/// equals itself. Lists compare element-wise; anything else must match in
/// type and value.
pub fn values_equal(doc: &Value, filter: &Value) -> bool {
    match (doc, filter) {
        (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => doc == filter,
    }
}

/// List membership, or substring for two strings. Everything else is false.
pub fn contains(doc: &Value, filter: &Value) -> bool {
    match (doc, filter) {
        (Value::List(items), _) => items.iter().any(|item| values_equal(item, filter)),
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

pub fn starts_with(doc: &Value, filter: &Value) -> bool {
    doc.canonical_string().starts_with(&filter.canonical_string())
}

pub fn ends_with(doc: &Value, filter: &Value) -> bool {
    doc.canonical_string().ends_with(&filter.canonical_string())
}

/// Numeric or lexicographic ordering; `None` when the operands are not
/// comparable.
pub fn ordering(doc: &Value, filter: &Value) -> Option<Ordering> {
    match (doc, filter) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// True when `filter` is a list holding a value equal to `doc`.
pub fn is_in(doc: &Value, filter: &Value) -> bool {
    filter
        .as_list()
        .is_some_and(|items| items.iter().any(|item| values_equal(doc, item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_coerced() {
        assert!(values_equal(&Value::from(5i64), &Value::from(5.0)));
        assert!(!values_equal(&Value::from(3.25), &Value::from(3i64)));
        assert!(!values_equal(&Value::from("5"), &Value::from(5i64)));
    }

    #[test]
    fn numbers_compare_by_bits() {
        assert!(!values_equal(&Value::from(0.0), &Value::from(-0.0)));
        assert!(values_equal(&Value::from(f64::NAN), &Value::from(f64::NAN)));
        assert!(values_equal(&Value::from(0i64), &Value::from(0.0)));

        let nan_list = Value::List(vec![Value::from(f64::NAN)]);
        assert!(values_equal(&nan_list, &nan_list.clone()));
        assert!(!values_equal(
            &Value::List(vec![Value::from(0.0)]),
            &Value::List(vec![Value::from(-0.0)])
        ));
    }

    #[test]
    fn contains_on_lists_and_strings() {
        let tags = Value::from(vec!["rust", "notes"]);
        assert!(contains(&tags, &Value::from("rust")));
        assert!(!contains(&tags, &Value::from("ru")));
        assert!(contains(&Value::from("hello world"), &Value::from("lo w")));
        assert!(!contains(&Value::from("Hello"), &Value::from("hello")));
        assert!(!contains(&Value::from(15i64), &Value::from(5i64)));
        assert!(contains(&Value::from(vec![1i64, 2]), &Value::from(2.0)));
    }

    #[test]
    fn prefix_and_suffix_use_canonical_strings() {
        assert!(starts_with(&Value::from(2024.0), &Value::from("20")));
        assert!(ends_with(&Value::from(1.50), &Value::from(".5")));
        assert!(starts_with(&Value::from(true), &Value::from("tr")));
        assert!(ends_with(&Value::from("draft.md"), &Value::from(".md")));
    }

    #[test]
    fn ordering_only_for_like_types() {
        assert_eq!(ordering(&Value::from(2i64), &Value::from(1.5)), Some(Ordering::Greater));
        assert_eq!(ordering(&Value::from("a"), &Value::from("b")), Some(Ordering::Less));
        assert_eq!(ordering(&Value::from("2"), &Value::from(1i64)), None);
        assert_eq!(ordering(&Value::Number(f64::NAN), &Value::from(1i64)), None);
    }

    #[test]
    fn in_requires_a_list() {
        let allowed = Value::from(vec!["draft", "review"]);
        assert!(is_in(&Value::from("draft"), &allowed));
        assert!(!is_in(&Value::from("done"), &allowed));
        assert!(!is_in(&Value::from("draft"), &Value::from("draft")));
    }
}
