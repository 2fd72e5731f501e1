//! Addressing into a [`Value`] tree.
//!
//! A [`Path`] is a sequence of [`PathElement`]s. Its textual form is a chain of
//! `.identifier`, `[123]` and `["quoted key"]` segments:
//!
//! ```
//! use jsonforge::{Path, path};
//!
//! let p = Path::create(r#".users[3]["display name"]"#).unwrap();
//! assert_eq!(p, path!["users", 3, "display name"]);
//! assert_eq!(p.to_string(), r#".users[3]["display name"]"#);
//! ```
use std::{fmt, ops::Add};

use thiserror::Error;

use crate::{
    codec::{self, StringEncoding},
    value::{Kind, Value},
};

/// One step of a [`Path`]: an array index or an object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    Index(usize),
    Key(String),
}

impl PathElement {
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        if let Self::Index(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        if let Self::Key(k) = self {
            Some(k)
        } else {
            None
        }
    }

    /// The kind of container this element steps into.
    #[must_use]
    pub fn container_kind(&self) -> Kind {
        match self {
            Self::Index(_) => Kind::Array,
            Self::Key(_) => Kind::Object,
        }
    }
}

fn is_identifier(key: &str) -> bool {
    let mut bytes = key.bytes();
    bytes
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_' || c == b'$')
        && bytes.all(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Key(k) if is_identifier(k) => write!(f, ".{k}"),
            Self::Key(k) => {
                f.write_str("[\"")?;
                codec::string_encode(f, k, false)?;
                f.write_str("\"]")
            }
        }
    }
}

// Convenient conversions so users can write `path![0, "foo"]` etc.
impl From<usize> for PathElement {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for PathElement {
    fn from(s: &str) -> Self {
        Self::Key(s.into())
    }
}

impl From<String> for PathElement {
    fn from(s: String) -> Self {
        Self::Key(s)
    }
}

#[doc(hidden)]
pub trait PathElementFrom<T> {
    fn from_path_element(value: T) -> PathElement;
}

macro_rules! impl_integer_as_path_element {
    ($($t:ty),+) => {
        $(
            impl PathElementFrom<$t> for PathElement {
                fn from_path_element(value: $t) -> Self {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    PathElement::Index(value as usize)
                }
            }
        )+
    };
}
impl_integer_as_path_element!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PathElementFrom<&str> for PathElement {
    fn from_path_element(value: &str) -> Self {
        PathElement::Key(value.into())
    }
}

impl PathElementFrom<String> for PathElement {
    fn from_path_element(value: String) -> Self {
        PathElement::Key(value)
    }
}

impl PathElementFrom<&String> for PathElement {
    fn from_path_element(value: &String) -> Self {
        PathElement::Key(value.clone())
    }
}

impl PathElementFrom<PathElement> for PathElement {
    fn from_path_element(value: PathElement) -> Self {
        value
    }
}

// Custom (de)serialization so that a `Path` becomes e.g. `["foo", 0, "bar"]`
// instead of the default tagged representation.
#[cfg(any(test, feature = "serde"))]
mod serde_impls {
    use std::fmt;

    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{Error, Unexpected, Visitor},
    };

    use super::PathElement;

    impl Serialize for PathElement {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match self {
                PathElement::Key(k) => serializer.serialize_str(k),
                PathElement::Index(i) => serializer.serialize_u64(*i as u64),
            }
        }
    }

    struct PathElementVisitor;

    impl Visitor<'_> for PathElementVisitor {
        type Value = PathElement;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or unsigned integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(PathElement::Key(value.into()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(PathElement::Key(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            usize::try_from(value)
                .map(PathElement::Index)
                .map_err(|_| Error::invalid_value(Unexpected::Unsigned(value), &"a usize index"))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            usize::try_from(value)
                .map(PathElement::Index)
                .map_err(|_| Error::invalid_value(Unexpected::Signed(value), &"non-negative index"))
        }
    }

    impl<'de> Deserialize<'de> for PathElement {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(PathElementVisitor)
        }
    }
}

/// An ordered sequence of [`PathElement`]s. The empty path addresses the root.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathElement>);

/// A path specification could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid specification \"{specification}\". Syntax error at \"{remaining}\"")]
pub struct PathSyntaxError {
    /// The full input.
    pub specification: String,
    /// The unparsed suffix, starting at the offending segment.
    pub remaining: String,
}

/// A path could not be resolved against a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("expected {expected} for element {element} of path {path}, found {actual}")]
    KindMismatch {
        element: PathElement,
        path: Path,
        expected: Kind,
        actual: Kind,
    },
    #[error("element {element} of path {path} does not exist")]
    NotFound { element: PathElement, path: Path },
    /// [`Value::path`] would have to pad an array with more than
    /// [`MAX_PADDING`] nulls to reach the index.
    #[error("element {element} of path {path} is too far past the end of its array")]
    TooFar { element: PathElement, path: Path },
    #[error(transparent)]
    Syntax(#[from] PathSyntaxError),
}

/// The most `null`s [`Value::path`] appends to an array to reach an index.
pub const MAX_PADDING: usize = 1 << 16;

impl Path {
    /// The empty path.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses the textual path grammar. The empty string is the root path.
    pub fn create(specification: &str) -> Result<Self, PathSyntaxError> {
        let mut out = Vec::new();
        let mut rest = specification;
        while !rest.is_empty() {
            let Some((element, consumed)) = match_segment(rest) else {
                return Err(PathSyntaxError {
                    specification: specification.into(),
                    remaining: rest.into(),
                });
            };
            out.push(element);
            rest = &rest[consumed..];
        }
        Ok(Self(out))
    }

    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn push(&mut self, element: impl Into<PathElement>) {
        self.0.push(element.into());
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    /// A new path with `other` appended.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut out = self.clone();
        out.0.extend_from_slice(&other.0);
        out
    }
}

/// Matches one segment at the start of `input`, returning the element and the
/// number of bytes consumed.
fn match_segment(input: &str) -> Option<(PathElement, usize)> {
    let bytes = input.as_bytes();
    match bytes.first()? {
        b'.' => {
            let len = 1 + bytes[1..]
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_' || **c == b'$')
                .count();
            let key = &input[1..len];
            is_identifier(key).then(|| (PathElement::Key(key.into()), len))
        }
        b'[' if bytes.get(1) == Some(&b'"') => {
            let mut i = 2;
            loop {
                match bytes.get(i)? {
                    b'\\' => i += 2,
                    b'"' => break,
                    _ => i += 1,
                }
            }
            if bytes.get(i + 1) != Some(&b']') {
                return None;
            }
            let key = codec::string_decode(&bytes[2..i], StringEncoding::Utf8).ok()?;
            Some((PathElement::Key(key), i + 2))
        }
        b'[' => {
            let digits = bytes[1..].iter().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 || bytes.get(1 + digits) != Some(&b']') {
                return None;
            }
            let index = input[1..=digits].parse().ok()?;
            Some((PathElement::Index(index), digits + 2))
        }
        _ => None,
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.0 {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::create(s)
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }
}

impl From<PathElement> for Path {
    fn from(element: PathElement) -> Self {
        Self(vec![element])
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PathElement> for Path {
    fn extend<I: IntoIterator<Item = PathElement>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Add<&Path> for Path {
    type Output = Path;

    fn add(mut self, rhs: &Path) -> Path {
        self.0.extend_from_slice(&rhs.0);
        self
    }
}

impl Add<PathElement> for Path {
    type Output = Path;

    fn add(mut self, rhs: PathElement) -> Path {
        self.0.push(rhs);
        self
    }
}

impl Value {
    /// Resolves `path` against this value.
    pub fn at_path(&self, path: &Path) -> Result<&Value, PathError> {
        let mut current = self;
        for element in path {
            current = match (element, current) {
                (PathElement::Index(i), Value::Array(items)) => items.get(*i),
                (PathElement::Key(k), Value::Object(entries)) => entries.get(k),
                (element, other) => return Err(mismatch(element, path, other.kind())),
            }
            .ok_or_else(|| not_found(element, path))?;
        }
        Ok(current)
    }

    pub fn at_path_mut(&mut self, path: &Path) -> Result<&mut Value, PathError> {
        let mut current = self;
        for element in path {
            current = match (element, current) {
                (PathElement::Index(i), Value::Array(items)) => items.get_mut(*i),
                (PathElement::Key(k), Value::Object(entries)) => entries.get_mut(k),
                (element, other) => return Err(mismatch(element, path, other.kind())),
            }
            .ok_or_else(|| not_found(element, path))?;
        }
        Ok(current)
    }

    /// Parses `specification` and resolves it.
    pub fn at_path_str(&self, specification: &str) -> Result<&Value, PathError> {
        self.at_path(&Path::create(specification)?)
    }

    /// `1` if `path` resolves, `0` otherwise.
    #[must_use]
    pub fn count_path(&self, path: &Path) -> usize {
        usize::from(self.at_path(path).is_ok())
    }

    /// Resolves `path`, creating whatever is missing along the way.
    ///
    /// `null` nodes become arrays or objects as the next element requires,
    /// arrays are padded with `null` up to the requested index, and absent
    /// keys are inserted as `null`. Stepping through any other kind fails, as
    /// does an index more than [`MAX_PADDING`] past the end of its array.
    ///
    /// ```
    /// use jsonforge::{Path, Value};
    ///
    /// let mut v = Value::Null;
    /// *v.path(&Path::create(".a[2]").unwrap()).unwrap() = Value::from(true);
    /// assert_eq!(v.to_string(), r#"{"a":[null,null,true]}"#);
    /// ```
    pub fn path(&mut self, path: &Path) -> Result<&mut Value, PathError> {
        let mut current = self;
        for element in path {
            if current.is_null() {
                *current = match element {
                    PathElement::Index(_) => Value::array(),
                    PathElement::Key(_) => Value::object(),
                };
            }
            current = match (element, current) {
                (PathElement::Index(i), Value::Array(items)) => {
                    if items.len() <= *i {
                        let len = i
                            .checked_add(1)
                            .filter(|len| len - items.len() <= MAX_PADDING)
                            .ok_or_else(|| too_far(element, path))?;
                        items.resize(len, Value::Null);
                    }
                    let Some(item) = items.get_mut(*i) else {
                        return Err(not_found(element, path));
                    };
                    item
                }
                (PathElement::Key(k), Value::Object(entries)) => {
                    entries.entry(k.clone()).or_default()
                }
                (element, other) => return Err(mismatch(element, path, other.kind())),
            };
        }
        Ok(current)
    }
}

fn mismatch(element: &PathElement, path: &Path, actual: Kind) -> PathError {
    PathError::KindMismatch {
        element: element.clone(),
        path: path.clone(),
        expected: element.container_kind(),
        actual,
    }
}

fn too_far(element: &PathElement, path: &Path) -> PathError {
    PathError::TooFar {
        element: element.clone(),
        path: path.clone(),
    }
}

fn not_found(element: &PathElement, path: &Path) -> PathError {
    PathError::NotFound {
        element: element.clone(),
        path: path.clone(),
    }
}

#[cfg(test)]
mod tests {

    use rstest::rstest;

    use super::*;
    use crate::path;

    #[rstest]
    #[case("", path![])]
    #[case(".a", path!["a"])]
    #[case(".$_x9[0]", path!["$_x9", 0])]
    #[case("[12][3]", path![12, 3])]
    #[case(r#"["with space"]"#, path!["with space"])]
    #[case(r#"["quote\"in"].b"#, path!["quote\"in", "b"])]
    #[case(r#"[""]"#, path![""])]
    #[case(r#"["é"]"#, path!["\u{e9}"])]
    fn create_accepts(#[case] spec: &str, #[case] expected: Path) {
        assert_eq!(Path::create(spec).unwrap(), expected);
    }

    #[rstest]
    #[case("a", "a")]
    #[case(".a..b", "..b")]
    #[case(".a[", "[")]
    #[case("[-1]", "[-1]")]
    #[case("[1.5]", "[1.5]")]
    #[case(r#"["open"#, r#"["open"#)]
    #[case(".9lives", ".9lives")]
    #[case(r#"["x"]junk"#, "junk")]
    fn create_rejects(#[case] spec: &str, #[case] remaining: &str) {
        let err = Path::create(spec).unwrap_err();
        assert_eq!(err.remaining, remaining);
        assert_eq!(err.specification, spec);
    }

    #[rstest]
    #[case(path!["plain", 0], ".plain[0]")]
    #[case(path!["has space"], r#"["has space"]"#)]
    #[case(path![""], r#"[""]"#)]
    #[case(path!["9lives"], r#"["9lives"]"#)]
    #[case(path!["a\"b\n"], r#"["a\"b\n"]"#)]
    fn display_round_trips(#[case] p: Path, #[case] text: &str) {
        assert_eq!(p.to_string(), text);
        assert_eq!(Path::create(text).unwrap(), p);
    }

    fn tree() -> Value {
        r#"{"a": [10, {"b": "deep"}], "s": "str"}"#.parse().unwrap()
    }

    #[test]
    fn resolves_existing_paths() {
        let v = tree();
        assert_eq!(v.at_path(&path!["a", 1, "b"]).unwrap(), &Value::from("deep"));
        assert_eq!(v.at_path(&Path::root()).unwrap(), &v);
        assert_eq!(v.count_path(&path!["a", 0]), 1);
        assert_eq!(v.count_path(&path!["a", 5]), 0);
    }

    #[test]
    fn reports_missing_and_mismatched_elements() {
        let v = tree();
        let p = path!["a", 7];
        assert_eq!(
            v.at_path(&p).unwrap_err(),
            PathError::NotFound {
                element: PathElement::Index(7),
                path: p.clone()
            }
        );

        let p = path!["s", "x"];
        match v.at_path(&p).unwrap_err() {
            PathError::KindMismatch {
                element,
                expected,
                actual,
                ..
            } => {
                assert_eq!(element, PathElement::Key("x".into()));
                assert_eq!(expected, Kind::Object);
                assert_eq!(actual, Kind::String);
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            v.at_path_str("bogus"),
            Err(PathError::Syntax(_))
        ));
    }

    #[test]
    fn ensure_creates_intermediate_nodes() {
        let mut v = Value::Null;
        *v.path(&path!["x", 1, "y"]).unwrap() = Value::from(5);
        assert_eq!(v.to_string(), r#"{"x":[null,{"y":5}]}"#);

        let mut v = tree();
        assert!(matches!(
            v.path(&path!["s", 0]),
            Err(PathError::KindMismatch { .. })
        ));
    }

    #[rstest]
    #[case("[18446744073709551615]")]
    #[case("[1000000000000]")]
    #[case(".a[65537]")]
    fn ensure_refuses_huge_indices(#[case] spec: &str) {
        let p = Path::create(spec).unwrap();
        let mut v = Value::Null;
        assert!(matches!(v.path(&p), Err(PathError::TooFar { .. })));
    }

    #[test]
    fn ensure_pads_up_to_the_limit() {
        let mut v = Value::from(vec![Value::from(1)]);
        v.path(&path![MAX_PADDING]).unwrap();
        assert_eq!(v.len(), Ok(MAX_PADDING + 1));
        assert_eq!(v.at(0).unwrap(), &Value::from(1));
        assert!(matches!(
            v.path(&path![2 * MAX_PADDING + 2]),
            Err(PathError::TooFar { .. })
        ));
    }

    #[test]
    fn resolves_quoted_keys_inside_arrays() {
        let v: Value = r#"{"a":[{"b c":5}]}"#.parse().unwrap();
        let p = Path::create(r#".a[0]["b c"]"#).unwrap();
        assert_eq!(p, path!["a", 0, "b c"]);
        assert_eq!(v.at_path(&p).unwrap(), &Value::from(5));
    }

    #[test]
    fn non_numeric_index_is_a_syntax_error() {
        let err = Path::create("[x]").unwrap_err();
        assert_eq!(err.remaining, "[x]");
        assert_eq!(
            err.to_string(),
            r#"Invalid specification "[x]". Syntax error at "[x]""#
        );
    }

    #[test]
    fn join_and_add() {
        let base = path!["a"];
        let joined = base.join(&path![1]);
        assert_eq!(joined, path!["a", 1]);
        assert_eq!(base.clone() + &path![1], joined);
        assert_eq!(base + PathElement::Index(1), joined);
    }

    #[test]
    fn serde_as_mixed_array() {
        let p = path!["foo", 0, "bar"];
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"["foo",0,"bar"]"#);
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
