//! Streaming lexer over any [`std::io::Read`].
//!
//! The tokenizer reads its input in chunks and splits it into [`Token`]s.
//! Every byte of input belongs to exactly one token, including whitespace and
//! comments; filtering is left to the parser. Malformed input never stops the
//! tokenizer: it produces a token with [`Token::is_error`] set and carries on
//! after it.
//!
//! ```
//! use jsonforge::{TokenKind, Tokenizer};
//!
//! let mut tokens = Tokenizer::new(&b"[1, true]"[..]);
//! let mut kinds = Vec::new();
//! while tokens.next().unwrap() {
//!     kinds.push(tokens.current().unwrap().kind);
//! }
//! assert_eq!(
//!     kinds,
//!     [
//!         TokenKind::ArrayBegin,
//!         TokenKind::Number,
//!         TokenKind::Separator,
//!         TokenKind::Whitespace,
//!         TokenKind::Boolean,
//!         TokenKind::ArrayEnd,
//!     ]
//! );
//! ```
use std::{
    fmt,
    io::{self, Read},
};

use tracing::trace;

/// Default number of bytes requested from the reader per refill.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * std::mem::size_of::<usize>();

/// The lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    ArrayBegin,
    ArrayEnd,
    ObjectBegin,
    ObjectEnd,
    ObjectKeyDelimiter,
    Separator,
    String,
    Number,
    Boolean,
    Null,
    Whitespace,
    Comment,
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenKind::ArrayBegin => "array_begin",
            TokenKind::ArrayEnd => "array_end",
            TokenKind::ObjectBegin => "object_begin",
            TokenKind::ObjectEnd => "object_end",
            TokenKind::ObjectKeyDelimiter => "object_key_delimiter",
            TokenKind::Separator => "separator",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Boolean => "boolean",
            TokenKind::Null => "null",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::Unknown => "unknown",
        })
    }
}

/// A lexed span of input. `text` borrows the tokenizer's buffer and is valid
/// until the next call to [`Tokenizer::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a [u8],
    /// Byte offset of the first byte of `text` from the start of input.
    pub offset: usize,
    /// The span is malformed or was cut short by the end of input.
    pub is_error: bool,
}

/// How well a pattern matched at the start of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchResult {
    /// A whole token; more input cannot change it.
    Complete,
    /// A whole token that more input could extend.
    CompleteEof,
    /// A valid prefix that needs more input to finish.
    IncompleteEof,
    /// Not a token.
    Unmatched,
}

type Match = (MatchResult, TokenKind, usize);

fn match_literal(buf: &[u8], literal: &[u8], kind: TokenKind) -> Match {
    for (i, expected) in literal.iter().enumerate() {
        match buf.get(i) {
            None => return (MatchResult::IncompleteEof, kind, i),
            Some(c) if c != expected => return (MatchResult::Unmatched, kind, i.max(1)),
            Some(_) => {}
        }
    }
    (MatchResult::Complete, kind, literal.len())
}

fn digits(buf: &[u8], from: usize) -> usize {
    buf.get(from..)
        .map_or(0, |rest| rest.iter().take_while(|c| c.is_ascii_digit()).count())
}

/// Whether `text` is exactly `-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?`.
fn is_number(text: &[u8]) -> bool {
    let mut i = usize::from(text.first() == Some(&b'-'));
    let int = digits(text, i);
    if int == 0 {
        return false;
    }
    i += int;
    if text.get(i) == Some(&b'.') {
        let frac = digits(text, i + 1);
        if frac == 0 {
            return false;
        }
        i += 1 + frac;
    }
    if matches!(text.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(text.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp = digits(text, i);
        if exp == 0 {
            return false;
        }
        i += exp;
    }
    i == text.len()
}

// The token spans the whole run of number-like bytes so a malformed number is
// reported and skipped as one unit.
fn match_number(buf: &[u8]) -> Match {
    let run = buf
        .iter()
        .take_while(|c| matches!(c, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
        .count();
    let valid = is_number(&buf[..run]);
    let result = match (run == buf.len(), valid) {
        (true, true) => MatchResult::CompleteEof,
        (true, false) => MatchResult::IncompleteEof,
        (false, true) => MatchResult::Complete,
        (false, false) => MatchResult::Unmatched,
    };
    (result, TokenKind::Number, run)
}

fn match_string(buf: &[u8]) -> Match {
    let mut len = 1;
    loop {
        match buf.get(len) {
            None => return (MatchResult::IncompleteEof, TokenKind::String, buf.len()),
            Some(b'"') => return (MatchResult::Complete, TokenKind::String, len + 1),
            Some(b'\\') if len + 1 == buf.len() => {
                return (MatchResult::IncompleteEof, TokenKind::String, buf.len());
            }
            Some(b'\\') => len += 2,
            Some(_) => len += 1,
        }
    }
}

fn match_whitespace(buf: &[u8]) -> Match {
    let len = buf
        .iter()
        .take_while(|c| matches!(c, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    let result = if len == buf.len() {
        MatchResult::CompleteEof
    } else {
        MatchResult::Complete
    };
    (result, TokenKind::Whitespace, len)
}

fn match_comment(buf: &[u8]) -> Match {
    match buf.get(1) {
        None => (MatchResult::IncompleteEof, TokenKind::Comment, 1),
        Some(b'*') => {
            let mut saw_asterisk = false;
            for (i, c) in buf.iter().enumerate().skip(2) {
                match c {
                    b'*' => saw_asterisk = true,
                    b'/' if saw_asterisk => return (MatchResult::Complete, TokenKind::Comment, i + 1),
                    _ => saw_asterisk = false,
                }
            }
            (MatchResult::IncompleteEof, TokenKind::Comment, buf.len())
        }
        Some(_) => (MatchResult::Unmatched, TokenKind::Comment, 1),
    }
}

/// Matches the token at the start of `buf`.
pub(crate) fn attempt_match(buf: &[u8]) -> Match {
    let Some(first) = buf.first() else {
        return (MatchResult::IncompleteEof, TokenKind::Unknown, 0);
    };
    let single = |kind| (MatchResult::Complete, kind, 1);
    match first {
        b'[' => single(TokenKind::ArrayBegin),
        b']' => single(TokenKind::ArrayEnd),
        b'{' => single(TokenKind::ObjectBegin),
        b'}' => single(TokenKind::ObjectEnd),
        b':' => single(TokenKind::ObjectKeyDelimiter),
        b',' => single(TokenKind::Separator),
        b't' => match_literal(buf, b"true", TokenKind::Boolean),
        b'f' => match_literal(buf, b"false", TokenKind::Boolean),
        b'n' => match_literal(buf, b"null", TokenKind::Null),
        b'-' | b'0'..=b'9' => match_number(buf),
        b'"' => match_string(buf),
        b' ' | b'\t' | b'\r' | b'\n' => match_whitespace(buf),
        b'/' => match_comment(buf),
        _ => (MatchResult::Unmatched, TokenKind::Unknown, 1),
    }
}

/// Splits a byte stream into [`Token`]s.
pub struct Tokenizer<R> {
    reader: R,
    buf: Vec<u8>,
    /// Absolute input offset of `buf[0]`.
    base: usize,
    start: usize,
    len: usize,
    kind: TokenKind,
    is_error: bool,
    has_current: bool,
    // `next` hands out the current token again instead of advancing.
    held: bool,
    chunk_size: usize,
    eof: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Reads at most `chunk_size` bytes (at least one) per refill.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(chunk_size.max(1)),
            base: 0,
            start: 0,
            len: 0,
            kind: TokenKind::Unknown,
            is_error: false,
            has_current: false,
            held: false,
            chunk_size: chunk_size.max(1),
            eof: false,
        }
    }

    /// Advances to the next token. Returns `Ok(false)` once the input is
    /// exhausted.
    pub fn next(&mut self) -> io::Result<bool> {
        if self.held {
            self.held = false;
            return Ok(true);
        }
        self.start += self.len;
        self.len = 0;
        self.has_current = false;
        loop {
            if self.start == self.buf.len() && !self.fill()? {
                return Ok(false);
            }
            let (result, kind, len) = attempt_match(&self.buf[self.start..]);
            let is_error = match result {
                MatchResult::CompleteEof | MatchResult::IncompleteEof => {
                    if self.fill()? {
                        continue;
                    }
                    result == MatchResult::IncompleteEof
                }
                MatchResult::Unmatched => true,
                MatchResult::Complete => false,
            };
            self.kind = kind;
            self.len = len;
            self.is_error = is_error;
            self.has_current = true;
            return Ok(true);
        }
    }

    /// Drops consumed bytes and appends up to one chunk from the reader.
    /// Returns `false` when nothing more could be read.
    fn fill(&mut self) -> io::Result<bool> {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.base += self.start;
            self.start = 0;
        }
        if self.eof {
            return Ok(false);
        }
        let old_len = self.buf.len();
        self.buf.resize(old_len + self.chunk_size, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[old_len..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buf.truncate(old_len);
                    return Err(e);
                }
            }
        };
        self.buf.truncate(old_len + read);
        trace!(read, buffered = self.buf.len(), offset = self.base, "tokenizer refill");
        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }
}

impl<R> Tokenizer<R> {
    /// The token produced by the last successful [`Tokenizer::next`].
    #[must_use]
    pub fn current(&self) -> Option<Token<'_>> {
        self.has_current.then(|| Token {
            kind: self.kind,
            text: &self.buf[self.start..self.start + self.len],
            offset: self.base + self.start,
            is_error: self.is_error,
        })
    }

    /// Makes the next call to [`Tokenizer::next`] yield the current token
    /// again. Does nothing before the first token or after the end of input.
    pub fn unread(&mut self) {
        self.held = self.has_current;
    }

    /// Bytes read from the input but not yet consumed by a token.
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.start + self.len..]
    }

    /// Releases the reader. Bytes already buffered are lost; read them with
    /// [`Tokenizer::remaining`] first.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> fmt::Debug for Tokenizer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("offset", &(self.base + self.start))
            .field("buffered", &self.buf.len())
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
