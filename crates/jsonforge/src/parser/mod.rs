//! Recursive-descent parser over a [`Tokenizer`].
//!
//! Open arrays and objects live on an explicit stack rather than the call
//! stack, so nesting depth is bounded by memory, not by recursion.
//!
//! The parser records a [`Problem`] for everything it objects to and, unless
//! told to fail immediately, recovers and keeps going: an unexpected token is
//! skipped up to the next structural token, which the enclosing array or
//! object then re-examines. The caller gets either the value or a
//! [`ParseError`] holding every problem and the value built in spite of them.
//!
//! ```
//! use jsonforge::{FailureMode, ParseOptions, Value, parse_with};
//!
//! let options = ParseOptions {
//!     failure_mode: FailureMode::CollectAll,
//!     ..Default::default()
//! };
//! let err = parse_with(br#"[1, @, 3]"#, &options).unwrap_err();
//! assert_eq!(err.problems.len(), 1);
//! assert_eq!(err.partial_result.to_string(), "[1,null,3]");
//! ```
mod error;
mod options;

use std::{
    convert::Infallible,
    io::{self, Read},
    mem,
};

use tracing::debug;

pub use self::{
    error::{ParseError, Problem},
    options::{CommaPolicy, FailureMode, NumberEncoding, ParseOptions},
};
use crate::{
    codec,
    encode::Encoder,
    tokenizer::{TokenKind, Tokenizer},
    value::{Array, Object, Value},
};

/// Parses `input` with default options.
pub fn parse(input: &str) -> Result<Value, ParseError> {
    parse_with(input.as_bytes(), &ParseOptions::default())
}

pub fn parse_with(input: &[u8], options: &ParseOptions) -> Result<Value, ParseError> {
    parse_reader(input, options)
}

/// Parses everything `reader` yields. A read error aborts the parse and is
/// available as the [`ParseError`]'s source.
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<Value, ParseError> {
    parse_tokens(&mut Tokenizer::new(reader), options)
}

/// Parses one value from `tokens`.
///
/// With [`ParseOptions::complete_parse`] off, the tokenizer is left just past
/// the value, so consecutive values can be read from one stream. A token the
/// parser looked at but did not consume, such as the `[` it stopped at while
/// recovering from a bad root value, is handed back to the tokenizer.
pub fn parse_tokens<R: Read>(
    tokens: &mut Tokenizer<R>,
    options: &ParseOptions,
) -> Result<Value, ParseError> {
    let mut parser = Parser::new(tokens, options);
    let result = parser.parse_document();
    if parser.replay {
        parser.tokens.unread();
    }
    match result {
        Ok(value) if !parser.failed || options.failure_mode == FailureMode::Ignore => Ok(value),
        Ok(value) => Err(ParseError {
            problems: parser.problems,
            partial_result: value,
            io: None,
        }),
        Err(Stop::Failed) => Err(ParseError {
            problems: parser.problems,
            partial_result: Value::Null,
            io: None,
        }),
        Err(Stop::Io(e)) => Err(ParseError {
            problems: parser.problems,
            partial_result: Value::Null,
            io: Some(e),
        }),
    }
}

/// Why parsing stopped before the end of input.
enum Stop {
    Failed,
    Io(io::Error),
}

type Step<T> = Result<T, Stop>;

/// An array or object still being read.
enum Frame {
    Array {
        items: Array,
        trailing_comma: bool,
        // An element was just read; a ',' or ']' comes next.
        after_element: bool,
    },
    Object {
        entries: Object,
        trailing_comma: bool,
        state: ObjectState,
    },
}

enum ObjectState {
    /// A key or '}' comes next.
    Key,
    /// Reading the value for this key.
    Value(String),
    /// Reading a structure found where a key belongs; it is dropped.
    Discard,
    /// A ',' or '}' comes next.
    Separator,
}

impl Frame {
    fn open(kind: TokenKind) -> Self {
        if kind == TokenKind::ArrayBegin {
            Frame::Array {
                items: Array::new(),
                trailing_comma: false,
                after_element: false,
            }
        } else {
            Frame::Object {
                entries: Object::new(),
                trailing_comma: false,
                state: ObjectState::Key,
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Frame::Array { items, .. } => Value::Array(items),
            Frame::Object { entries, .. } => Value::Object(entries),
        }
    }
}

/// The next move of the parse loop.
enum Action {
    /// Read a value starting at the next token, or at the current one when
    /// `advance` is false.
    Begin { advance: bool },
    /// Continue the innermost open structure.
    Resume,
    /// Close the innermost open structure and hand it to its parent.
    Close,
    /// Hand a value to the innermost open structure. `None` means the input
    /// ended where a value should have started.
    Deliver(Option<Value>),
}

struct Parser<'t, R> {
    tokens: &'t mut Tokenizer<R>,
    options: &'t ParseOptions,
    problems: Vec<Problem>,
    failed: bool,

    // Owned copy of the current token.
    kind: TokenKind,
    text: Vec<u8>,
    is_error: bool,
    offset: usize,

    line: usize,
    line_start: usize,
    // The current token is handed out again by the next call to `next`.
    replay: bool,
}

fn starts_value(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::ArrayBegin
            | TokenKind::ObjectBegin
            | TokenKind::String
            | TokenKind::Number
            | TokenKind::Boolean
            | TokenKind::Null
    )
}

fn is_structural(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::ArrayBegin
            | TokenKind::ArrayEnd
            | TokenKind::ObjectBegin
            | TokenKind::ObjectEnd
            | TokenKind::Separator
            | TokenKind::ObjectKeyDelimiter
    )
}

impl<'t, R: Read> Parser<'t, R> {
    fn new(tokens: &'t mut Tokenizer<R>, options: &'t ParseOptions) -> Self {
        Self {
            tokens,
            options,
            problems: Vec::new(),
            failed: false,
            kind: TokenKind::Unknown,
            text: Vec::new(),
            is_error: false,
            offset: 0,
            line: 1,
            line_start: 0,
            replay: false,
        }
    }

    // ── token stream ─────────────────────────────────────────────────────

    /// Moves to the next raw token, keeping the line count in step.
    fn advance(&mut self) -> Step<bool> {
        for (i, b) in self.text.iter().enumerate() {
            if *b == b'\n' {
                self.line += 1;
                self.line_start = self.offset + i + 1;
            }
        }
        self.offset += self.text.len();
        self.text.clear();
        if !self.tokens.next().map_err(Stop::Io)? {
            return Ok(false);
        }
        let Some(token) = self.tokens.current() else {
            return Ok(false);
        };
        self.kind = token.kind;
        self.is_error = token.is_error;
        self.offset = token.offset;
        self.text.extend_from_slice(token.text);
        Ok(true)
    }

    /// Moves to the next significant token, skipping whitespace and comments.
    fn next(&mut self) -> Step<bool> {
        if self.replay {
            self.replay = false;
            return Ok(true);
        }
        loop {
            if !self.advance()? {
                return Ok(false);
            }
            match self.kind {
                TokenKind::Whitespace => {}
                TokenKind::Comment if !self.is_error => {
                    if !self.options.comments {
                        self.problem("JSON comment is not allowed")?;
                    }
                }
                _ => return Ok(true),
            }
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }

    // ── diagnostics ──────────────────────────────────────────────────────

    fn problem(&mut self, message: impl Into<String>) -> Step<()> {
        let problem = Problem {
            line: self.line,
            column: self.offset.saturating_sub(self.line_start) + 1,
            offset: self.offset,
            message: message.into(),
        };
        debug!(
            line = problem.line,
            column = problem.column,
            offset = problem.offset,
            message = %problem.message,
            "parse problem"
        );
        #[cfg(any(test, feature = "fuzzing"))]
        if self.options.panic_on_problem {
            panic!("{problem}");
        }
        self.failed = true;
        if self.options.failure_mode == FailureMode::FailImmediately {
            self.problems.push(problem);
            return Err(Stop::Failed);
        }
        if self.problems.len() < self.options.max_failures {
            self.problems.push(problem);
        }
        Ok(())
    }

    // ── grammar ──────────────────────────────────────────────────────────

    fn parse_document(&mut self) -> Step<Value> {
        let value = if let Some(value) = self.parse_value()? {
            value
        } else {
            self.problem("No input")?;
            Value::Null
        };

        if !self.failed && self.options.complete_parse {
            while self.next()? {
                if self.text.iter().any(|b| *b != 0) {
                    let kind = self.kind;
                    self.problem(format!("Found non-trivial data after final token. {kind}"))?;
                    break;
                }
            }
        }

        if !self.failed && self.options.require_document && !value.is_array() && !value.is_object() {
            self.problem(format!(
                "JSON requires the root of a payload to be an array or object, not {}",
                value.kind()
            ))?;
        }

        let max = self.options.max_structure_depth;
        if max > 0 {
            let mut checker = DepthChecker::default();
            let Ok(()) = checker.encode(&value);
            if checker.deepest > max {
                self.problem(format!("Structure depth reached maximum of {max}"))?;
            }
        }

        Ok(value)
    }

    /// How many structures may be open at once. With a maximum depth set,
    /// one level past it is built so the depth check can see the excess.
    fn depth_budget(&self) -> usize {
        match (self.options.max_structure_depth, self.options.nesting_limit) {
            (0, 0) => usize::MAX,
            (0, limit) => limit,
            (max, _) => max.saturating_add(1),
        }
    }

    /// Reads the value starting at the next token. `None` means the input
    /// ended first.
    fn parse_value(&mut self) -> Step<Option<Value>> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut action = Action::Begin { advance: true };
        loop {
            action = match action {
                Action::Begin { advance } => self.begin(advance, &mut stack)?,
                Action::Resume => match stack.last_mut() {
                    Some(Frame::Array {
                        trailing_comma,
                        after_element,
                        ..
                    }) => self.resume_array(trailing_comma, after_element)?,
                    Some(Frame::Object {
                        trailing_comma,
                        state,
                        ..
                    }) => self.resume_object(trailing_comma, state)?,
                    None => return Ok(None),
                },
                Action::Close => Action::Deliver(stack.pop().map(Frame::into_value)),
                Action::Deliver(value) => match stack.last_mut() {
                    None => return Ok(value),
                    Some(Frame::Array {
                        items,
                        trailing_comma,
                        after_element,
                    }) => {
                        items.extend(value);
                        *trailing_comma = false;
                        *after_element = true;
                        Action::Resume
                    }
                    Some(Frame::Object { entries, state, .. }) => {
                        self.deliver_to_object(entries, state, value)?
                    }
                },
            };
        }
    }

    fn begin(&mut self, advance: bool, stack: &mut Vec<Frame>) -> Step<Action> {
        if advance && !self.next()? {
            return Ok(Action::Deliver(None));
        }
        if self.is_error {
            return Ok(Action::Deliver(Some(self.invalid_token()?)));
        }
        let value = match self.kind {
            TokenKind::ArrayBegin | TokenKind::ObjectBegin => {
                if stack.len() >= self.depth_budget() {
                    // Past a configured maximum depth the depth check reports.
                    if self.options.max_structure_depth == 0 {
                        let limit = self.options.nesting_limit;
                        self.problem(format!("Structure nesting exceeds limit of {limit}"))?;
                    }
                    self.skip_structure()?;
                    Value::Null
                } else {
                    stack.push(Frame::open(self.kind));
                    return Ok(Action::Resume);
                }
            }
            TokenKind::Boolean => Value::Boolean(self.text == b"true"),
            TokenKind::Null => Value::Null,
            TokenKind::Number => self.parse_number()?,
            TokenKind::String => Value::String(self.parse_string()?),
            _ => self.invalid_token()?,
        };
        Ok(Action::Deliver(Some(value)))
    }

    fn invalid_token(&mut self) -> Step<Value> {
        let message = format!("Encountered invalid token {}: \"{}\"", self.kind, self.text());
        self.problem(message)?;
        self.forward_to_structural()?;
        Ok(Value::Null)
    }

    /// Skips tokens until one that can delimit a value, which is replayed to
    /// the caller.
    fn forward_to_structural(&mut self) -> Step<()> {
        loop {
            if !self.is_error && is_structural(self.kind) {
                self.replay = true;
                return Ok(());
            }
            if !self.next()? {
                return Ok(());
            }
        }
    }

    /// Skips to the end of the structure opened by the current token.
    fn skip_structure(&mut self) -> Step<()> {
        let mut open = 1usize;
        while self.next()? {
            match self.kind {
                TokenKind::ArrayBegin | TokenKind::ObjectBegin => open += 1,
                TokenKind::ArrayEnd | TokenKind::ObjectEnd => {
                    open -= 1;
                    if open == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_number(&mut self) -> Step<Value> {
        let text = self.text();
        if self.options.number_encoding == NumberEncoding::Strict {
            let digits = text.strip_prefix('-').unwrap_or(&text).as_bytes();
            if digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit() {
                self.problem("Numbers cannot start with a leading '0'")?;
            }
        }

        let parsed = if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>().ok().map(Value::Decimal)
        } else if text.starts_with('-') {
            text.parse::<i64>().ok().map(Value::Integer)
        } else {
            // 2^63..2^64-1 keep their bits; callers reading such a key must
            // know it is unsigned.
            #[allow(clippy::cast_possible_wrap)]
            text.parse::<u64>().ok().map(|n| Value::Integer(n as i64))
        };
        // Integers too large for 64 bits fall back to a decimal.
        match parsed.or_else(|| text.parse::<f64>().ok().map(Value::Decimal)) {
            Some(value) => Ok(value),
            None => {
                self.problem(format!("Could not extract number from \"{text}\""))?;
                Ok(Value::Null)
            }
        }
    }

    /// Decodes the current string token. On failure the raw contents are kept.
    fn parse_string(&mut self) -> Step<String> {
        let inner = &self.text[1..self.text.len() - 1];
        match codec::string_decode(inner, self.options.string_encoding) {
            Ok(s) => Ok(s),
            Err(e) => {
                let raw = String::from_utf8_lossy(inner).into_owned();
                self.problem(format!("Error decoding string: {e}"))?;
                Ok(raw)
            }
        }
    }

    fn resume_array(&mut self, trailing_comma: &mut bool, after_element: &mut bool) -> Step<Action> {
        if !self.next()? {
            self.problem("Unexpected end: unmatched '['")?;
            return Ok(Action::Close);
        }
        if !mem::take(after_element) {
            if self.kind == TokenKind::ArrayEnd {
                if *trailing_comma && self.options.comma_policy == CommaPolicy::Strict {
                    self.problem("Array contained a trailing comma")?;
                }
                return Ok(Action::Close);
            }
            return Ok(Action::Begin { advance: false });
        }
        match self.kind {
            TokenKind::ArrayEnd => return Ok(Action::Close),
            TokenKind::Separator => *trailing_comma = true,
            kind => {
                self.problem("Invalid entry when looking for ',' or ']'")?;
                // A missing comma: read the token as the next element.
                if !self.is_error && starts_value(kind) {
                    self.replay = true;
                }
            }
        }
        Ok(Action::Resume)
    }

    fn resume_object(&mut self, trailing_comma: &mut bool, state: &mut ObjectState) -> Step<Action> {
        let expecting_key = match state {
            ObjectState::Key => true,
            ObjectState::Separator => false,
            // Waiting on a value, which arrives through `Deliver`.
            ObjectState::Value(_) | ObjectState::Discard => {
                return Ok(Action::Begin { advance: false });
            }
        };
        if !self.next()? {
            self.problem("Unexpected end inside of object.")?;
            return Ok(Action::Close);
        }

        if !expecting_key {
            *state = ObjectState::Key;
            match self.kind {
                TokenKind::ObjectEnd => return Ok(Action::Close),
                TokenKind::Separator => *trailing_comma = true,
                kind => {
                    self.problem("Invalid token while searching for next value in object.")?;
                    match kind {
                        // A missing comma before the next key.
                        TokenKind::String if !self.is_error => self.replay = true,
                        TokenKind::ArrayBegin | TokenKind::ObjectBegin => {
                            *state = ObjectState::Discard;
                            return Ok(Action::Begin { advance: false });
                        }
                        _ => {}
                    }
                }
            }
            return Ok(Action::Resume);
        }

        let key = match self.kind {
            TokenKind::String if !self.is_error => {
                *trailing_comma = false;
                self.parse_string()?
            }
            TokenKind::ObjectEnd => {
                if *trailing_comma && self.options.comma_policy == CommaPolicy::Strict {
                    self.problem("Trailing comma at end of object.")?;
                }
                return Ok(Action::Close);
            }
            kind => {
                self.problem(format!("Expecting a key, but found {kind}"))?;
                match kind {
                    TokenKind::ArrayBegin | TokenKind::ObjectBegin => {
                        *state = ObjectState::Discard;
                        return Ok(Action::Begin { advance: false });
                    }
                    TokenKind::Separator | TokenKind::ObjectKeyDelimiter | TokenKind::ArrayEnd => {
                        return Ok(Action::Resume);
                    }
                    // Carry on as if the token were the key.
                    _ => self.text(),
                }
            }
        };

        if !self.next()? {
            self.problem(format!("Unexpected end: missing ':' for key '{key}'"))?;
            return Ok(Action::Close);
        }
        if self.kind != TokenKind::ObjectKeyDelimiter {
            let kind = self.kind;
            self.problem(format!(
                "Invalid key-value delimiter...expecting ':' after key '{key}'"
            ))?;
            if !self.is_error && starts_value(kind) {
                self.replay = true;
            } else if matches!(kind, TokenKind::ObjectEnd | TokenKind::Separator) {
                self.replay = true;
                *state = ObjectState::Separator;
                return Ok(Action::Resume);
            }
        }
        *state = ObjectState::Value(key);
        Ok(Action::Begin { advance: true })
    }

    fn deliver_to_object(
        &mut self,
        entries: &mut Object,
        state: &mut ObjectState,
        value: Option<Value>,
    ) -> Step<Action> {
        match mem::replace(state, ObjectState::Separator) {
            ObjectState::Value(key) => {
                let Some(value) = value else {
                    self.problem(format!("Unexpected end: incomplete value for key '{key}'"))?;
                    return Ok(Action::Close);
                };
                if let Some(old) = entries.get_mut(&key) {
                    let message = format!(
                        "Duplicate entries for key '{key}'. Updating old value {old} with new value {value}."
                    );
                    *old = value;
                    self.problem(message)?;
                } else {
                    entries.insert(key, value);
                }
            }
            ObjectState::Discard => *state = ObjectState::Key,
            other => *state = other,
        }
        Ok(Action::Resume)
    }
}

/// Measures nesting depth by walking a value as an encoder.
#[derive(Default)]
struct DepthChecker {
    depth: usize,
    deepest: usize,
}

impl DepthChecker {
    fn open(&mut self) -> Result<(), Infallible> {
        self.depth += 1;
        self.deepest = self.deepest.max(self.depth);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Infallible> {
        self.depth -= 1;
        Ok(())
    }
}

impl Encoder for DepthChecker {
    type Error = Infallible;

    fn write_null(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_boolean(&mut self, _: bool) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_integer(&mut self, _: i64) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_decimal(&mut self, _: f64) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_string(&mut self, _: &str) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_array_begin(&mut self) -> Result<(), Infallible> {
        self.open()
    }

    fn write_array_end(&mut self) -> Result<(), Infallible> {
        self.close()
    }

    fn write_array_delimiter(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_object_begin(&mut self) -> Result<(), Infallible> {
        self.open()
    }

    fn write_object_end(&mut self) -> Result<(), Infallible> {
        self.close()
    }

    fn write_object_delimiter(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_object_key(&mut self, _: &str) -> Result<(), Infallible> {
        Ok(())
    }
}
