#![allow(clippy::struct_excessive_bools)]

use crate::codec::StringEncoding;

/// What the parser does once it has recorded a problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FailureMode {
    /// Stop at the first problem and return it alone.
    #[default]
    FailImmediately,
    /// Recover, keep going, and report every problem at the end.
    CollectAll,
    /// Recover, keep going, and return the best-effort value as a success.
    Ignore,
}

/// How numeric tokens are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NumberEncoding {
    /// Accept anything the tokenizer recognizes as a number.
    #[default]
    Lenient,
    /// Additionally reject integer parts with a leading zero, such as `007`.
    Strict,
}

/// Whether a comma may follow the last element of an array or object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CommaPolicy {
    Strict,
    #[default]
    AllowTrailing,
}

/// Configuration for [`parse_with`](crate::parse_with) and friends.
///
/// # Examples
///
/// ```rust
/// use jsonforge::{FailureMode, ParseOptions, parse_with};
///
/// let options = ParseOptions {
///     failure_mode: FailureMode::CollectAll,
///     comments: false,
///     ..Default::default()
/// };
/// let err = parse_with(b"[1, /* no */ 2, 3,]", &options);
/// assert!(err.is_err());
/// ```
///
/// # Default
///
/// The defaults are lenient: trailing commas, comments and scalar documents
/// are accepted, and the first problem fails the parse.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// See [`FailureMode`].
    ///
    /// # Default
    ///
    /// [`FailureMode::FailImmediately`]
    pub failure_mode: FailureMode,

    /// The most problems a [`ParseError`](crate::ParseError) will carry.
    /// Problems past the limit still fail the parse; they are just not kept.
    ///
    /// # Default
    ///
    /// `10`
    pub max_failures: usize,

    /// How string contents are decoded.
    ///
    /// # Default
    ///
    /// [`StringEncoding::Utf8`]
    pub string_encoding: StringEncoding,

    /// # Default
    ///
    /// [`NumberEncoding::Lenient`]
    pub number_encoding: NumberEncoding,

    /// # Default
    ///
    /// [`CommaPolicy::AllowTrailing`]
    pub comma_policy: CommaPolicy,

    /// Nesting depth past which a document is rejected, checked once the
    /// whole value is built. `[[1]]` has depth 2. Zero disables the check.
    ///
    /// # Default
    ///
    /// `0`
    pub max_structure_depth: usize,

    /// Require the top-level value to be an array or an object.
    ///
    /// # Default
    ///
    /// `false`
    pub require_document: bool,

    /// Require everything after the top-level value to be whitespace or
    /// comments.
    ///
    /// # Default
    ///
    /// `true`
    pub complete_parse: bool,

    /// Allow `/* ... */` comments.
    ///
    /// # Default
    ///
    /// `true`
    pub comments: bool,

    /// Nesting depth past which structures are skipped rather than built,
    /// recording a problem. Applies only while
    /// [`max_structure_depth`](Self::max_structure_depth) is zero; a configured
    /// maximum takes its place. Parsing never recurses, but dropping,
    /// encoding and comparing a value do. Zero disables the limit.
    ///
    /// # Default
    ///
    /// `1024`
    pub nesting_limit: usize,

    #[cfg(any(test, feature = "fuzzing"))]
    /// Panic on the first recorded problem instead of collecting it.
    ///
    /// Enabled only in test builds to produce backtraces on parse failures.
    pub panic_on_problem: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::FailImmediately,
            max_failures: 10,
            string_encoding: StringEncoding::Utf8,
            number_encoding: NumberEncoding::Lenient,
            comma_policy: CommaPolicy::AllowTrailing,
            max_structure_depth: 0,
            require_document: false,
            complete_parse: true,
            comments: true,
            nesting_limit: 1024,
            #[cfg(any(test, feature = "fuzzing"))]
            panic_on_problem: false,
        }
    }
}

impl ParseOptions {
    /// Options that accept only RFC 8259 documents: strict UTF-8 and numbers,
    /// no trailing commas, no comments, a structured root and at most 20
    /// levels of nesting.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            failure_mode: FailureMode::FailImmediately,
            string_encoding: StringEncoding::Utf8Strict,
            number_encoding: NumberEncoding::Strict,
            comma_policy: CommaPolicy::Strict,
            max_structure_depth: 20,
            require_document: true,
            complete_parse: true,
            comments: false,
            ..Self::default()
        }
    }
}
