//! JSON values, a recovering parser, path addressing and a composable type
//! registry.
//!
//! ```rust
//! use jsonforge::{Formats, Value, extract, parse, path};
//!
//! let doc = parse(r#"{"user": {"name": "Ada", "tags": ["x", "y"]}}"#).unwrap();
//! assert_eq!(doc.at_path(&path!["user", "tags", 1]).unwrap(), &Value::from("y"));
//!
//! let name: String = extract(doc.at_path_str(".user.name").unwrap(), &Formats::defaults()).unwrap();
//! assert_eq!(name, "Ada");
//! ```

#![allow(missing_docs)]

mod adapters;
mod algorithm;
mod codec;
mod coerce;
mod compare;
mod context;
mod encode;
mod formats;
mod parser;
mod path;
mod tokenizer;
mod value;

#[cfg(test)]
mod tests;

pub use adapters::{
    EnumAdapter, Member, ObjectAdapter, map_adapter, option_adapter, reject_extra_keys, vec_adapter,
};
pub use algorithm::{map, map_into, traverse, traverse_from};
pub use codec::{DecodeError, DecodeErrorKind, StringEncoding, escape_string, string_decode, string_encode};
pub use coerce::{
    CoerceError, can_coerce, can_coerce_kind, coerce_array, coerce_boolean, coerce_decimal,
    coerce_integer, coerce_null, coerce_object, coerce_string,
};
pub use compare::{CaseInsensitive, CaseSensitive, Comparator, compare, compare_icase};
pub use context::{
    ExtractionContext, ExtractionError, SerializationContext, SerializationError, Version, extract,
    extract_global, to_json, to_json_global,
};
pub use encode::{
    CompactEncoder, Encoder, PrettyEncoder, to_string, to_string_pretty, to_writer, to_writer_pretty,
};
pub use formats::{
    Adapter, BoxError, Extractor, Formats, FormatsBuilder, NoExtractor, NoSerializer,
    RegistrationError, Serializer, adapter_fn, extractor_fn, serializer_fn,
};
pub use parser::{
    CommaPolicy, FailureMode, NumberEncoding, ParseError, ParseOptions, Problem, parse, parse_reader,
    parse_tokens, parse_with,
};
pub use path::{MAX_PADDING, Path, PathElement, PathElementFrom, PathError, PathSyntaxError};
pub use tokenizer::{DEFAULT_CHUNK_SIZE, Token, TokenKind, Tokenizer};
pub use value::{Array, Kind, KindError, Object, Value, ValueError};

#[doc(hidden)]
pub use std::vec;

/// Builds a [`Path`] from a heterogeneous list of keys and indices.
///
/// ```rust
/// # use jsonforge::{path, Path, PathElement};
/// let p = path![0, "foo", 2];
/// assert_eq!(
///     p,
///     Path::from(vec![
///         PathElement::Index(0),
///         PathElement::Key("foo".into()),
///         PathElement::Index(2)
///     ])
/// );
/// assert_eq!(p.to_string(), "[0].foo[2]");
/// ```
#[macro_export]
macro_rules! path {
    ( $( $elem:expr ),* $(,)? ) => {{
        #[allow(unused_imports)]
        use $crate::PathElementFrom;
        $crate::Path::from($crate::vec![$($crate::PathElement::from_path_element($elem)),*])
    }};
}
