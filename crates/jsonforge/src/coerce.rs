//! Lenient conversions between value kinds.
//!
//! Accessors such as [`Value::as_integer`] fail on any kind mismatch. The
//! functions here instead follow the usual JSON truthiness rules: `null` is
//! false, containers and strings are truthy when non-empty, and numeric
//! strings are parsed.

use thiserror::Error;

use crate::{
    encode::to_string,
    parser::parse,
    value::{Array, Kind, Object, Value},
};

/// A value could not be coerced to the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("Invalid kind for {target}: {actual}")]
    InvalidKind { target: Kind, actual: Kind },
    #[error("Could not interpret string {text} as {} {target}.", article(*.target))]
    Unparseable { target: Kind, text: String },
}

fn article(kind: Kind) -> &'static str {
    match kind {
        Kind::Integer | Kind::Object | Kind::Array => "an",
        _ => "a",
    }
}

fn invalid(target: Kind, from: &Value) -> CoerceError {
    CoerceError::InvalidKind {
        target,
        actual: from.kind(),
    }
}

/// Whether a value of kind `from` can always be coerced to `to`.
///
/// Strings are never reported as convertible to numbers here, since that
/// depends on their contents; see [`can_coerce`].
#[must_use]
pub fn can_coerce_kind(from: Kind, to: Kind) -> bool {
    match to {
        Kind::Null | Kind::Object | Kind::Array => from == to,
        Kind::String | Kind::Boolean => true,
        Kind::Integer | Kind::Decimal => matches!(from, Kind::Integer | Kind::Decimal),
    }
}

/// Whether `from` can be coerced to `to`, attempting the numeric parse for
/// strings.
#[must_use]
pub fn can_coerce(from: &Value, to: Kind) -> bool {
    if can_coerce_kind(from.kind(), to) {
        return true;
    }
    match (from, to) {
        (Value::String(_), Kind::Integer) => coerce_integer(from).is_ok(),
        (Value::String(_), Kind::Decimal) => coerce_decimal(from).is_ok(),
        _ => false,
    }
}

pub fn coerce_null(from: &Value) -> Result<(), CoerceError> {
    match from {
        Value::Null => Ok(()),
        _ => Err(invalid(Kind::Null, from)),
    }
}

pub fn coerce_object(from: &Value) -> Result<Object, CoerceError> {
    match from {
        Value::Object(o) => Ok(o.clone()),
        _ => Err(invalid(Kind::Object, from)),
    }
}

pub fn coerce_array(from: &Value) -> Result<Array, CoerceError> {
    match from {
        Value::Array(a) => Ok(a.clone()),
        _ => Err(invalid(Kind::Array, from)),
    }
}

/// Strings are returned as they are; anything else as its compact JSON text.
#[must_use]
pub fn coerce_string(from: &Value) -> String {
    match from {
        Value::String(s) => s.clone(),
        other => to_string(other),
    }
}

/// Coerces to an integer.
///
/// Booleans become `0` or `1`. Decimals are truncated toward zero and
/// saturate at the bounds of `i64`. Strings are parsed as JSON and must hold
/// a number.
pub fn coerce_integer(from: &Value) -> Result<i64, CoerceError> {
    match from {
        Value::Boolean(b) => Ok(i64::from(*b)),
        Value::Integer(i) => Ok(*i),
        #[allow(clippy::cast_possible_truncation)]
        Value::Decimal(d) => Ok(*d as i64),
        Value::String(s) => match parse(s) {
            Ok(parsed @ (Value::Integer(_) | Value::Decimal(_) | Value::Null)) => {
                coerce_integer(&parsed)
            }
            _ => Err(CoerceError::Unparseable {
                target: Kind::Integer,
                text: to_string(from),
            }),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => Err(invalid(Kind::Integer, from)),
    }
}

/// Coerces to a decimal, with the same rules as [`coerce_integer`].
pub fn coerce_decimal(from: &Value) -> Result<f64, CoerceError> {
    match from {
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        #[allow(clippy::cast_precision_loss)]
        Value::Integer(i) => Ok(*i as f64),
        Value::Decimal(d) => Ok(*d),
        Value::String(s) => match parse(s) {
            Ok(parsed @ (Value::Integer(_) | Value::Decimal(_) | Value::Null)) => {
                coerce_decimal(&parsed)
            }
            _ => Err(CoerceError::Unparseable {
                target: Kind::Decimal,
                text: to_string(from),
            }),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => Err(invalid(Kind::Decimal, from)),
    }
}

pub fn coerce_boolean(from: &Value) -> bool {
    match from {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Decimal(d) => *d != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::Null, false)]
    #[case(Value::from(0), false)]
    #[case(Value::from(-3), true)]
    #[case(Value::from(0.0), false)]
    #[case(Value::from(""), false)]
    #[case(Value::from("false"), true)]
    #[case(Value::array(), false)]
    #[case(Value::from(vec![Value::Null]), true)]
    #[case(Value::object(), false)]
    fn truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(coerce_boolean(&value), expected);
    }

    #[rstest]
    #[case(Value::from(true), 1)]
    #[case(Value::from(2.9), 2)]
    #[case(Value::from(-2.9), -2)]
    #[case(Value::from(1e300), i64::MAX)]
    #[case(Value::from(" 42 "), 42)]
    #[case(Value::from("7.5"), 7)]
    fn integers(#[case] value: Value, #[case] expected: i64) {
        assert_eq!(coerce_integer(&value), Ok(expected));
    }

    #[test]
    fn integer_failures() {
        assert_eq!(
            coerce_integer(&Value::from("forty")).unwrap_err().to_string(),
            r#"Could not interpret string "forty" as an integer."#
        );
        assert_eq!(
            coerce_integer(&Value::from("[1]")).unwrap_err().to_string(),
            r#"Could not interpret string "[1]" as an integer."#
        );
        assert_eq!(
            coerce_integer(&Value::from("null")).unwrap_err().to_string(),
            "Invalid kind for integer: null"
        );
        assert_eq!(
            coerce_integer(&Value::array()).unwrap_err(),
            CoerceError::InvalidKind {
                target: Kind::Integer,
                actual: Kind::Array
            }
        );
    }

    #[test]
    fn decimals() {
        assert_eq!(coerce_decimal(&Value::from(3)), Ok(3.0));
        assert_eq!(coerce_decimal(&Value::from("1e2")), Ok(100.0));
        assert_eq!(
            coerce_decimal(&Value::from("x")).unwrap_err().to_string(),
            r#"Could not interpret string "x" as a decimal."#
        );
    }

    #[test]
    fn strings() {
        assert_eq!(coerce_string(&Value::from("plain")), "plain");
        assert_eq!(coerce_string(&Value::from(vec![Value::from(1)])), "[1]");
        assert_eq!(coerce_string(&Value::Null), "null");
    }

    #[rstest]
    #[case(Kind::Null, Kind::Null, true)]
    #[case(Kind::Array, Kind::Object, false)]
    #[case(Kind::Object, Kind::Boolean, true)]
    #[case(Kind::Array, Kind::String, true)]
    #[case(Kind::Decimal, Kind::Integer, true)]
    #[case(Kind::String, Kind::Integer, false)]
    fn kinds(#[case] from: Kind, #[case] to: Kind, #[case] expected: bool) {
        assert_eq!(can_coerce_kind(from, to), expected);
    }

    #[test]
    fn numeric_strings_are_tried() {
        assert!(can_coerce(&Value::from("12"), Kind::Integer));
        assert!(!can_coerce(&Value::from("twelve"), Kind::Decimal));
        assert!(!can_coerce(&Value::from(1), Kind::Array));
    }

    #[test]
    fn containers_require_matching_kind() {
        assert_eq!(coerce_array(&Value::array()), Ok(Vec::new()));
        assert!(coerce_object(&Value::Null).is_err());
        assert!(coerce_null(&Value::Null).is_ok());
        assert_eq!(
            coerce_null(&Value::from(1)).unwrap_err().to_string(),
            "Invalid kind for null: integer"
        );
    }
}
