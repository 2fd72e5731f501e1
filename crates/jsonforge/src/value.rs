//! JSON value types and utilities.
//!
//! This module defines the [`Value`] enum, which represents any JSON value, the
//! [`Kind`] discriminant, and the structural operations on arrays and objects.
//!
use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use thiserror::Error;

use crate::{ParseError, compare};

/// Objects keep their keys sorted; iteration order is lexicographic by key.
pub type Object = BTreeMap<String, Value>;
/// Arrays keep insertion order.
pub type Array = Vec<Value>;

/// The discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Decimal,
    String,
    Array,
    Object,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        })
    }
}

/// An accessor was used against a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected type: expected {} but found {actual}", KindList(.expected))]
pub struct KindError {
    /// The kinds that would have been accepted.
    pub expected: Vec<Kind>,
    /// The kind that was found.
    pub actual: Kind,
}

struct KindList<'a>(&'a [Kind]);

impl fmt::Display for KindList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(if i + 1 == self.0.len() { " or " } else { ", " })?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}

/// Failure of an element-level array or object operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error(transparent)]
    Kind(#[from] KindError),
    #[error("index {index} is out of range for an array of size {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("key \"{0}\" does not exist")]
    MissingKey(String),
}

/// A JSON value.
///
/// Exactly seven kinds exist: `null`, `boolean`, `integer` (64-bit signed),
/// `decimal` (64-bit float), `string`, `array` and `object`. Arrays preserve
/// insertion order; objects are sorted by key.
///
/// Equality and ordering are structural and follow [`compare::compare`]:
/// integers and decimals compare by numeric value, so `1 == 1.0`.
///
/// # Examples
///
/// ```
/// use jsonforge::{Object, Value};
///
/// let mut map = Object::new();
/// map.insert("key".to_string(), Value::from("value"));
/// let v = Value::Object(map);
/// assert_eq!(v.to_string(), r#"{"key":"value"}"#);
/// ```
// Untagged so a `Value` serializes as the JSON it models.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(untagged))]
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Array),
    Object(Object),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

macro_rules! impl_from_integer_for_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer_for_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    /// Values above `i64::MAX` keep their bit pattern, the same way the
    /// parser stores them.
    fn from(v: u64) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Decimal(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Decimal(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Value {
    /// An empty array.
    #[must_use]
    pub fn array() -> Self {
        Self::Array(Array::new())
    }

    /// An empty object.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(Object::new())
    }

    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Moves the value out, leaving `null` behind.
    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }

    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(..))
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(..))
    }

    #[must_use]
    pub fn is_decimal(&self) -> bool {
        matches!(self, Self::Decimal(..))
    }

    /// Returns `true` for both integers and decimals.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(..) | Self::Decimal(..))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(..))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(..))
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(..))
    }

    fn kind_error(&self, expected: &[Kind]) -> KindError {
        KindError {
            expected: expected.to_vec(),
            actual: self.kind(),
        }
    }

    /// Fails unless this value's kind is one of `expected`.
    pub fn check_kind(&self, expected: &[Kind]) -> Result<(), KindError> {
        if expected.contains(&self.kind()) {
            Ok(())
        } else {
            Err(self.kind_error(expected))
        }
    }

    pub fn as_boolean(&self) -> Result<bool, KindError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.kind_error(&[Kind::Boolean])),
        }
    }

    pub fn as_integer(&self) -> Result<i64, KindError> {
        match self {
            Value::Integer(i) => Ok(*i),
            _ => Err(self.kind_error(&[Kind::Integer])),
        }
    }

    /// Reads a decimal. Integers widen implicitly.
    pub fn as_decimal(&self) -> Result<f64, KindError> {
        match self {
            Value::Decimal(d) => Ok(*d),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(self.kind_error(&[Kind::Decimal, Kind::Integer])),
        }
    }

    pub fn as_str(&self) -> Result<&str, KindError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.kind_error(&[Kind::String])),
        }
    }

    pub fn as_array(&self) -> Result<&Array, KindError> {
        match self {
            Value::Array(a) => Ok(a),
            _ => Err(self.kind_error(&[Kind::Array])),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array, KindError> {
        match self {
            Value::Array(a) => Ok(a),
            _ => Err(self.kind_error(&[Kind::Array])),
        }
    }

    pub fn as_object(&self) -> Result<&Object, KindError> {
        match self {
            Value::Object(o) => Ok(o),
            _ => Err(self.kind_error(&[Kind::Object])),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut Object, KindError> {
        match self {
            Value::Object(o) => Ok(o),
            _ => Err(self.kind_error(&[Kind::Object])),
        }
    }

    /// Number of elements (array), entries (object) or bytes (string).
    pub fn len(&self) -> Result<usize, KindError> {
        match self {
            Value::String(s) => Ok(s.len()),
            Value::Array(a) => Ok(a.len()),
            Value::Object(o) => Ok(o.len()),
            _ => Err(self.kind_error(&[Kind::Object, Kind::Array, Kind::String])),
        }
    }

    pub fn is_empty(&self) -> Result<bool, KindError> {
        self.len().map(|len| len == 0)
    }

    // ── arrays ───────────────────────────────────────────────────────────

    /// Iterates over array elements. The iterator is double-ended, so
    /// `.rev()` walks the array backwards.
    pub fn iter_array(&self) -> Result<std::slice::Iter<'_, Value>, KindError> {
        self.as_array().map(|a| a.iter())
    }

    pub fn iter_array_mut(&mut self) -> Result<std::slice::IterMut<'_, Value>, KindError> {
        self.as_array_mut().map(|a| a.iter_mut())
    }

    pub fn at(&self, index: usize) -> Result<&Value, ValueError> {
        let arr = self.as_array()?;
        let len = arr.len();
        arr.get(index)
            .ok_or(ValueError::IndexOutOfRange { index, len })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut Value, ValueError> {
        let arr = self.as_array_mut()?;
        let len = arr.len();
        arr.get_mut(index)
            .ok_or(ValueError::IndexOutOfRange { index, len })
    }

    pub fn push_back(&mut self, value: impl Into<Value>) -> Result<(), KindError> {
        self.as_array_mut()?.push(value.into());
        Ok(())
    }

    pub fn push_back_cloned(&mut self, value: &Value) -> Result<(), KindError> {
        self.push_back(value.clone())
    }

    pub fn push_front(&mut self, value: impl Into<Value>) -> Result<(), KindError> {
        self.as_array_mut()?.insert(0, value.into());
        Ok(())
    }

    /// Removes the last element; `Ok(None)` on an empty array.
    pub fn pop_back(&mut self) -> Result<Option<Value>, KindError> {
        Ok(self.as_array_mut()?.pop())
    }

    /// Removes the first element; `Ok(None)` on an empty array.
    pub fn pop_front(&mut self) -> Result<Option<Value>, KindError> {
        let arr = self.as_array_mut()?;
        Ok(if arr.is_empty() {
            None
        } else {
            Some(arr.remove(0))
        })
    }

    /// Inserts before `index`; `index == len` appends.
    pub fn insert_at(&mut self, index: usize, value: impl Into<Value>) -> Result<(), ValueError> {
        let arr = self.as_array_mut()?;
        if index > arr.len() {
            return Err(ValueError::IndexOutOfRange {
                index,
                len: arr.len(),
            });
        }
        arr.insert(index, value.into());
        Ok(())
    }

    pub fn erase_at(&mut self, index: usize) -> Result<Value, ValueError> {
        let arr = self.as_array_mut()?;
        if index >= arr.len() {
            return Err(ValueError::IndexOutOfRange {
                index,
                len: arr.len(),
            });
        }
        Ok(arr.remove(index))
    }

    /// Grows (padding with `null`) or shrinks the array to `len` elements.
    pub fn resize(&mut self, len: usize) -> Result<(), KindError> {
        self.as_array_mut()?.resize(len, Value::Null);
        Ok(())
    }

    // ── objects ──────────────────────────────────────────────────────────

    /// Iterates over object entries in key order. The iterator is
    /// double-ended.
    pub fn iter_object(
        &self,
    ) -> Result<std::collections::btree_map::Iter<'_, String, Value>, KindError> {
        self.as_object().map(|o| o.iter())
    }

    pub fn iter_object_mut(
        &mut self,
    ) -> Result<std::collections::btree_map::IterMut<'_, String, Value>, KindError> {
        self.as_object_mut().map(|o| o.iter_mut())
    }

    /// Looks up `key`; `Ok(None)` when absent.
    pub fn get(&self, key: &str) -> Result<Option<&Value>, KindError> {
        Ok(self.as_object()?.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<Option<&mut Value>, KindError> {
        Ok(self.as_object_mut()?.get_mut(key))
    }

    pub fn at_key(&self, key: &str) -> Result<&Value, ValueError> {
        self.as_object()?
            .get(key)
            .ok_or_else(|| ValueError::MissingKey(key.into()))
    }

    pub fn at_key_mut(&mut self, key: &str) -> Result<&mut Value, ValueError> {
        self.as_object_mut()?
            .get_mut(key)
            .ok_or_else(|| ValueError::MissingKey(key.into()))
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, KindError> {
        Ok(self.as_object_mut()?.insert(key.into(), value.into()))
    }

    pub fn insert_cloned(&mut self, key: &str, value: &Value) -> Result<Option<Value>, KindError> {
        self.insert(key, value.clone())
    }

    /// Removes `key`, returning its value if it was present.
    pub fn erase(&mut self, key: &str) -> Result<Option<Value>, KindError> {
        Ok(self.as_object_mut()?.remove(key))
    }

    /// `1` if the object holds `key`, `0` otherwise.
    pub fn count(&self, key: &str) -> Result<usize, KindError> {
        Ok(usize::from(self.as_object()?.contains_key(key)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare::compare(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        compare::compare(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::encode::to_string(self))
    }
}

impl FromStr for Value {
    type Err = ParseError;

    /// Parses with default options.
    ///
    /// ```
    /// use jsonforge::Value;
    ///
    /// let v: Value = r#"{"a": [1, 2.5]}"#.parse().unwrap();
    /// assert_eq!(v.at_path_str(".a[1]").unwrap(), &Value::Decimal(2.5));
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s)
    }
}
