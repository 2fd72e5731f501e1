//! String escaping and unescaping.
//!
//! The decoder works on the raw bytes between the quotes of a string token and
//! produces a `String`; it owns every escape and UTF-8 rule, so the tokenizer
//! only needs to find the closing quote. The encoder goes the other way and
//! can either pass non-ASCII text through or force `\uXXXX` escapes.

use std::fmt;

use thiserror::Error;

/// How raw bytes inside string literals are interpreted when decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    /// UTF-8 text. Raw control characters are passed through.
    #[default]
    Utf8,
    /// UTF-8 text that must not contain raw (unescaped) control characters.
    Utf8Strict,
    /// Modified UTF-8 where surrogate halves may be encoded individually,
    /// either as `\uXXXX` escapes or as raw 3-byte sequences. Halves that
    /// pair up are combined; lone halves become U+FFFD.
    Cesu8,
}

/// A failure to decode the contents of a string literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (at byte {offset})")]
pub struct DecodeError {
    /// Byte offset into the decoded source where the problem starts.
    pub offset: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

/// The reason a [`DecodeError`] was raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("unknown escape character '{0}'")]
    UnknownEscape(char),
    #[error("backslash at end of string")]
    UnterminatedEscape,
    #[error("the character '{0}' is not a valid hexadecimal digit")]
    InvalidHexDigit(char),
    #[error("unterminated unicode escape sequence (must have 4 hex characters)")]
    UnterminatedUnicodeEscape,
    #[error("unpaired surrogate \\u{0:04x}")]
    UnpairedSurrogate(u16),
    #[error("invalid UTF-8 code point: \\x{0:02x}")]
    InvalidUtf8Byte(u8),
    #[error("invalid UTF-8 multi-byte sequence")]
    InvalidUtf8Sequence,
    #[error("unterminated UTF-8 sequence at end of string")]
    TruncatedUtf8Sequence,
    #[error("unprintable character found in input: \\x{0:02x}")]
    Unprintable(u8),
}

impl DecodeErrorKind {
    fn at(self, offset: usize) -> DecodeError {
        DecodeError { offset, kind: self }
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn simple_unescape(b: u8) -> Option<char> {
    Some(match b {
        b'b' => '\u{8}',
        b'f' => '\u{c}',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'\\' => '\\',
        b'/' => '/',
        b'"' => '"',
        _ => return None,
    })
}

fn simple_escape(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{8}' => "\\b",
        '\u{c}' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\\' => "\\\\",
        '"' => "\\\"",
        _ => return None,
    })
}

fn hex_value(b: u8, offset: usize) -> Result<u16, DecodeError> {
    match b {
        b'0'..=b'9' => Ok(u16::from(b - b'0')),
        b'a'..=b'f' => Ok(u16::from(b - b'a' + 10)),
        b'A'..=b'F' => Ok(u16::from(b - b'A' + 10)),
        _ => Err(DecodeErrorKind::InvalidHexDigit(char::from(b)).at(offset)),
    }
}

/// Reads the four hex digits of a `\uXXXX` escape starting at `escape_start`
/// (the index of the backslash).
fn read_unicode_escape(source: &[u8], escape_start: usize) -> Result<u16, DecodeError> {
    let digits = source
        .get(escape_start + 2..escape_start + 6)
        .ok_or(DecodeErrorKind::UnterminatedUnicodeEscape.at(escape_start))?;
    digits.iter().enumerate().try_fold(0u16, |acc, (i, &b)| {
        Ok((acc << 4) | hex_value(b, escape_start + 2 + i)?)
    })
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn combine_surrogates(high: u16, low: u16) -> char {
    let code = 0x10000 + ((u32::from(high & 0x3ff) << 10) | u32::from(low & 0x3ff));
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Splits a code point above the basic multilingual plane into UTF-16
/// surrogate halves.
fn split_surrogates(code: u32) -> (u16, u16) {
    let val = code - 0x10000;
    let high = ((val >> 10) as u16) | 0xD800;
    let low = ((val & 0x3ff) as u16) | 0xDC00;
    (high, low)
}

/// Raw CESU-8 encoding of a surrogate half: `ED A0..BF 80..BF`.
fn raw_surrogate(source: &[u8]) -> Option<u16> {
    match source {
        [0xED, b1 @ 0xA0..=0xBF, b2 @ 0x80..=0xBF, ..] => {
            Some(0xD000 | (u16::from(b1 & 0x3f) << 6) | u16::from(b2 & 0x3f))
        }
        _ => None,
    }
}

/// Explains why `bstr::decode_utf8` rejected the sequence at `idx`.
fn classify_utf8_failure(source: &[u8], idx: usize) -> DecodeError {
    let lead = source[idx];
    let expected = match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return DecodeErrorKind::InvalidUtf8Byte(lead).at(idx),
    };
    let tail = &source[idx + 1..];
    if idx + expected > source.len() && tail.iter().all(|b| b & 0xC0 == 0x80) {
        DecodeErrorKind::TruncatedUtf8Sequence.at(idx)
    } else {
        DecodeErrorKind::InvalidUtf8Sequence.at(idx)
    }
}

/// Pairs surrogate halves seen in CESU-8 mode.
#[derive(Default)]
struct SurrogatePairing {
    pending_high: Option<u16>,
}

impl SurrogatePairing {
    fn push(&mut self, out: &mut String, unit: u16) {
        if is_high_surrogate(unit) {
            self.flush(out);
            self.pending_high = Some(unit);
        } else if is_low_surrogate(unit) {
            match self.pending_high.take() {
                Some(high) => out.push(combine_surrogates(high, unit)),
                None => out.push(char::REPLACEMENT_CHARACTER),
            }
        } else {
            self.flush(out);
            out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }

    fn flush(&mut self, out: &mut String) {
        if self.pending_high.take().is_some() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Decodes the body of a JSON string literal (the text between the quotes).
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the byte offset of the first malformed
/// escape or UTF-8 sequence.
pub fn string_decode(source: &[u8], encoding: StringEncoding) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(source.len());
    let mut pairing = SurrogatePairing::default();
    let mut idx = 0;

    while idx < source.len() {
        let b = source[idx];
        if b == b'\\' {
            let next = *source
                .get(idx + 1)
                .ok_or(DecodeErrorKind::UnterminatedEscape.at(idx))?;
            if let Some(c) = simple_unescape(next) {
                pairing.flush(&mut out);
                out.push(c);
                idx += 2;
                continue;
            }
            if next != b'u' {
                return Err(DecodeErrorKind::UnknownEscape(char::from(next)).at(idx));
            }

            let unit = read_unicode_escape(source, idx)?;
            if encoding == StringEncoding::Cesu8 {
                pairing.push(&mut out, unit);
                idx += 6;
            } else if !is_high_surrogate(unit) && !is_low_surrogate(unit) {
                out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
                idx += 6;
            } else {
                let unpaired = DecodeErrorKind::UnpairedSurrogate(unit).at(idx);
                if is_low_surrogate(unit)
                    || source.get(idx + 6) != Some(&b'\\')
                    || source.get(idx + 7) != Some(&b'u')
                {
                    return Err(unpaired);
                }
                let low = read_unicode_escape(source, idx + 6)?;
                if !is_low_surrogate(low) {
                    return Err(unpaired);
                }
                out.push(combine_surrogates(unit, low));
                idx += 12;
            }
        } else if b.is_ascii() {
            pairing.flush(&mut out);
            if encoding == StringEncoding::Utf8Strict && (b < 0x20 || b == 0x7f) {
                return Err(DecodeErrorKind::Unprintable(b).at(idx));
            }
            out.push(char::from(b));
            idx += 1;
        } else {
            match bstr::decode_utf8(&source[idx..]) {
                (Some(c), len) => {
                    pairing.flush(&mut out);
                    out.push(c);
                    idx += len;
                }
                (None, _) => match raw_surrogate(&source[idx..]) {
                    Some(unit) if encoding == StringEncoding::Cesu8 => {
                        pairing.push(&mut out, unit);
                        idx += 3;
                    }
                    _ => return Err(classify_utf8_failure(source, idx)),
                },
            }
        }
    }

    pairing.flush(&mut out);
    Ok(out)
}

fn write_unicode_escape<W: fmt::Write>(f: &mut W, unit: u16) -> fmt::Result {
    f.write_str("\\u")?;
    for shift in [12, 8, 4, 0] {
        f.write_char(char::from(HEX_DIGITS[usize::from((unit >> shift) & 0xf)]))?;
    }
    Ok(())
}

/// Escapes `src` for inclusion in a JSON string literal (without the
/// surrounding quotes).
///
/// Quotes, backslashes and control characters are always escaped, as are the
/// Unicode line separators U+2028 and U+2029 which pre-2019 JavaScript
/// parsers reject. With `ensure_ascii` every other non-ASCII character is
/// written as a `\uXXXX` escape too, using a surrogate pair above the basic
/// multilingual plane.
pub fn string_encode<W: fmt::Write>(f: &mut W, src: &str, ensure_ascii: bool) -> fmt::Result {
    let mut run_start = 0;
    for (idx, c) in src.char_indices() {
        let needs_escape = c == '"'
            || c == '\\'
            || c.is_ascii_control()
            || c == '\u{2028}'
            || c == '\u{2029}'
            || (ensure_ascii && !c.is_ascii());
        if !needs_escape {
            continue;
        }

        f.write_str(&src[run_start..idx])?;
        run_start = idx + c.len_utf8();

        if let Some(escape) = simple_escape(c) {
            f.write_str(escape)?;
        } else if (c as u32) < 0x10000 {
            write_unicode_escape(f, c as u16)?;
        } else {
            let (high, low) = split_surrogates(c as u32);
            write_unicode_escape(f, high)?;
            write_unicode_escape(f, low)?;
        }
    }
    f.write_str(&src[run_start..])
}

/// Convenience wrapper around [`string_encode`] that returns a `String`.
#[must_use]
pub fn escape_string(src: &str, ensure_ascii: bool) -> String {
    let mut result = String::with_capacity(src.len() + 2);
    // Writing into a `String` cannot fail.
    let _ = string_encode(&mut result, src, ensure_ascii);
    result
}
