//! Structural comparison of [`Value`]s.
//!
//! Values of different kinds order as `null < boolean < number < string <
//! array < object`. Integers and decimals share the number rank and compare by
//! numeric value. Arrays compare lexicographically element by element; objects
//! compare their key-sorted entries the same way.
use std::cmp::Ordering;

use crate::value::Value;

/// A comparison strategy. Strategies vary how string values and object keys
/// compare; the structural walk is shared.
pub trait Comparator {
    fn compare_strings(&self, a: &str, b: &str) -> Ordering;

    /// Orders object keys. Byte order unless overridden.
    fn compare_object_keys(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
            (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
            (Value::Integer(x), Value::Decimal(y)) => compare_decimals(*x as f64, *y),
            (Value::Decimal(x), Value::Integer(y)) => compare_decimals(*x, *y as f64),
            (Value::Decimal(x), Value::Decimal(y)) => compare_decimals(*x, *y),
            (Value::String(x), Value::String(y)) => self.compare_strings(x, y),
            (Value::Array(x), Value::Array(y)) => {
                for (l, r) in x.iter().zip(y) {
                    match self.compare(l, r) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
                x.len().cmp(&y.len())
            }
            (Value::Object(x), Value::Object(y)) => {
                for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                    match self
                        .compare_object_keys(lk, rk)
                        .then_with(|| self.compare(lv, rv))
                    {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
                x.len().cmp(&y.len())
            }
            _ => kind_rank(a).cmp(&kind_rank(b)),
        }
    }
}

/// Byte-wise string comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseSensitive;

impl Comparator for CaseSensitive {
    fn compare_strings(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// ASCII case-insensitive comparison of string values. Object keys still
/// compare byte-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitive;

impl Comparator for CaseInsensitive {
    fn compare_strings(&self, a: &str, b: &str) -> Ordering {
        a.bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
    }
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Decimal(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

// NaN has no partial order; fall back to the IEEE total order so the result
// stays a total order.
fn compare_decimals(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Case-sensitive structural comparison.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    CaseSensitive.compare(a, b)
}

/// Structural comparison with ASCII case-insensitive string values.
#[must_use]
pub fn compare_icase(a: &Value, b: &Value) -> Ordering {
    CaseInsensitive.compare(a, b)
}

impl Value {
    /// Compares with a custom strategy.
    pub fn compare_with<C: Comparator + ?Sized>(&self, other: &Value, comparator: &C) -> Ordering {
        comparator.compare(self, other)
    }
}

#[cfg(test)]
mod tests {

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::Null, Value::from(false))]
    #[case(Value::from(true), Value::from(-5))]
    #[case(Value::from(1e300), Value::from(""))]
    #[case(Value::from("zzz"), Value::array())]
    #[case(Value::from(vec![Value::from(9)]), Value::object())]
    #[case(Value::from(1), Value::from(1.5))]
    #[case(Value::from(-0.5), Value::from(0))]
    #[case(Value::from("A"), Value::from("a"))]
    #[case(Value::from(vec![Value::from(1)]), Value::from(vec![Value::from(1), Value::Null]))]
    fn strictly_ordered(#[case] lesser: Value, #[case] greater: Value) {
        assert_eq!(compare(&lesser, &greater), Ordering::Less);
        assert_eq!(compare(&greater, &lesser), Ordering::Greater);
        assert!(lesser < greater);
    }

    #[test]
    fn integer_and_decimal_compare_numerically() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(1), Value::from(1.25));
    }

    #[test]
    fn objects_compare_by_sorted_entries() {
        let a = Value::from_iter([("a", Value::from(1)), ("b", Value::from(2))]);
        let b = Value::from_iter([("b", Value::from(2)), ("a", Value::from(1))]);
        assert_eq!(a, b);
        let c = Value::from_iter([("a", Value::from(1)), ("c", Value::from(0))]);
        assert!(a < c);
    }

    #[test]
    fn icase_folds_string_values() {
        let a = Value::from_iter([("key", Value::from("VALUE"))]);
        let b = Value::from_iter([("key", Value::from("value"))]);
        assert_ne!(compare(&a, &b), Ordering::Equal);
        assert_eq!(compare_icase(&a, &b), Ordering::Equal);
        assert_eq!(a.compare_with(&b, &CaseInsensitive), Ordering::Equal);
    }

    #[test]
    fn icase_keeps_object_keys_exact() {
        let a = Value::from_iter([("Key", Value::from("v"))]);
        let b = Value::from_iter([("key", Value::from("v"))]);
        assert_eq!(compare_icase(&a, &b), Ordering::Less);
        assert_eq!(compare_icase(&b, &a), Ordering::Greater);
        assert_eq!(compare_icase(&Value::from("Key"), &Value::from("key")), Ordering::Equal);
    }

    struct KeysFolded;

    impl Comparator for KeysFolded {
        fn compare_strings(&self, a: &str, b: &str) -> Ordering {
            a.cmp(b)
        }

        fn compare_object_keys(&self, a: &str, b: &str) -> Ordering {
            CaseInsensitive.compare_strings(a, b)
        }
    }

    #[test]
    fn key_rule_is_overridable() {
        let a = Value::from_iter([("Key", Value::from("v"))]);
        let b = Value::from_iter([("key", Value::from("v"))]);
        assert_eq!(a.compare_with(&b, &KeysFolded), Ordering::Equal);
        assert_ne!(
            Value::from("A").compare_with(&Value::from("a"), &KeysFolded),
            Ordering::Equal
        );
    }

    #[test]
    fn nan_is_totally_ordered() {
        let nan = Value::from(f64::NAN);
        assert_eq!(compare(&nan, &nan), Ordering::Equal);
        assert_ne!(compare(&nan, &Value::from(0.0)), Ordering::Equal);
    }
}
