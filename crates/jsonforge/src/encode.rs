//! Writing [`Value`]s as JSON text.
//!
//! An [`Encoder`] receives one call per structural event. [`Encoder::encode`]
//! walks a value and issues those calls, so an implementation only decides how
//! each event is rendered. [`CompactEncoder`] writes no insignificant
//! whitespace; [`PrettyEncoder`] breaks lines and indents nested structures.
//!
//! ```
//! use jsonforge::{Value, to_string_pretty};
//!
//! let v: Value = r#"{"a": [1, 2], "b": {}}"#.parse().unwrap();
//! assert_eq!(
//!     to_string_pretty(&v),
//!     "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {}\n}"
//! );
//! ```
use std::io::{self, Write};

use crate::{codec, value::Value};

/// Receives a value as a sequence of events.
pub trait Encoder {
    /// What a failed write reports. Encoders that cannot fail use
    /// [`Infallible`](std::convert::Infallible).
    type Error;

    fn write_null(&mut self) -> Result<(), Self::Error>;
    fn write_boolean(&mut self, value: bool) -> Result<(), Self::Error>;
    fn write_integer(&mut self, value: i64) -> Result<(), Self::Error>;
    fn write_decimal(&mut self, value: f64) -> Result<(), Self::Error>;
    fn write_string(&mut self, value: &str) -> Result<(), Self::Error>;
    fn write_array_begin(&mut self) -> Result<(), Self::Error>;
    fn write_array_end(&mut self) -> Result<(), Self::Error>;
    /// Called between two array elements.
    fn write_array_delimiter(&mut self) -> Result<(), Self::Error>;
    fn write_object_begin(&mut self) -> Result<(), Self::Error>;
    fn write_object_end(&mut self) -> Result<(), Self::Error>;
    /// Called between two object entries.
    fn write_object_delimiter(&mut self) -> Result<(), Self::Error>;
    /// Called before each entry's value, including the key delimiter.
    fn write_object_key(&mut self, key: &str) -> Result<(), Self::Error>;

    /// Emits the events for `value`.
    fn encode(&mut self, value: &Value) -> Result<(), Self::Error> {
        match value {
            Value::Null => self.write_null(),
            Value::Boolean(b) => self.write_boolean(*b),
            Value::Integer(i) => self.write_integer(*i),
            Value::Decimal(d) => self.write_decimal(*d),
            Value::String(s) => self.write_string(s),
            Value::Array(items) => {
                self.write_array_begin()?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write_array_delimiter()?;
                    }
                    self.encode(item)?;
                }
                self.write_array_end()
            }
            Value::Object(entries) => {
                self.write_object_begin()?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.write_object_delimiter()?;
                    }
                    self.write_object_key(key)?;
                    self.encode(item)?;
                }
                self.write_object_end()
            }
        }
    }
}

/// Writes JSON with no insignificant whitespace.
#[derive(Debug)]
pub struct CompactEncoder<W> {
    out: W,
    ensure_ascii: bool,
    scratch: String,
}

impl<W: Write> CompactEncoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            ensure_ascii: false,
            scratch: String::new(),
        }
    }

    /// Escape every non-ASCII character as `\uXXXX`.
    #[must_use]
    pub fn ensure_ascii(mut self, ensure_ascii: bool) -> Self {
        self.ensure_ascii = ensure_ascii;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_quoted(&mut self, s: &str) -> io::Result<()> {
        self.scratch.clear();
        self.scratch.push('"');
        codec::string_encode(&mut self.scratch, s, self.ensure_ascii)
            .map_err(|_| io::Error::other("formatting failed"))?;
        self.scratch.push('"');
        self.out.write_all(self.scratch.as_bytes())
    }
}

impl<W: Write> Encoder for CompactEncoder<W> {
    type Error = io::Error;

    fn write_null(&mut self) -> io::Result<()> {
        self.out.write_all(b"null")
    }

    fn write_boolean(&mut self, value: bool) -> io::Result<()> {
        self.out.write_all(if value { b"true" } else { b"false" })
    }

    fn write_integer(&mut self, value: i64) -> io::Result<()> {
        write!(self.out, "{value}")
    }

    // Debug formatting always includes a '.' or an exponent, so the text reads
    // back as a decimal. Non-finite values have no JSON form.
    fn write_decimal(&mut self, value: f64) -> io::Result<()> {
        if value.is_finite() {
            write!(self.out, "{value:?}")
        } else {
            self.write_null()
        }
    }

    fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_quoted(value)
    }

    fn write_array_begin(&mut self) -> io::Result<()> {
        self.out.write_all(b"[")
    }

    fn write_array_end(&mut self) -> io::Result<()> {
        self.out.write_all(b"]")
    }

    fn write_array_delimiter(&mut self) -> io::Result<()> {
        self.out.write_all(b",")
    }

    fn write_object_begin(&mut self) -> io::Result<()> {
        self.out.write_all(b"{")
    }

    fn write_object_end(&mut self) -> io::Result<()> {
        self.out.write_all(b"}")
    }

    fn write_object_delimiter(&mut self) -> io::Result<()> {
        self.out.write_all(b",")
    }

    fn write_object_key(&mut self, key: &str) -> io::Result<()> {
        self.write_quoted(key)?;
        self.out.write_all(b":")
    }
}

/// Writes JSON with one element per line, nested structures indented.
///
/// Empty arrays and objects stay on one line (`[]`, `{}`).
#[derive(Debug)]
pub struct PrettyEncoder<W> {
    inner: CompactEncoder<W>,
    indent: usize,
    indent_size: usize,
    // A container was just opened; the line break before its first element
    // is held back so an empty container closes on the same line.
    defer_indent: bool,
}

impl<W: Write> PrettyEncoder<W> {
    /// Indents by two spaces per level.
    pub fn new(out: W) -> Self {
        Self::with_indent(out, 2)
    }

    pub fn with_indent(out: W, indent_size: usize) -> Self {
        Self {
            inner: CompactEncoder::new(out),
            indent: 0,
            indent_size,
            defer_indent: false,
        }
    }

    #[must_use]
    pub fn ensure_ascii(mut self, ensure_ascii: bool) -> Self {
        self.inner.ensure_ascii = ensure_ascii;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    fn write_eol(&mut self) -> io::Result<()> {
        self.inner.out.write_all(b"\n")?;
        for _ in 0..self.indent {
            self.inner.out.write_all(b" ")?;
        }
        Ok(())
    }

    fn write_prefix(&mut self) -> io::Result<()> {
        if self.defer_indent {
            self.defer_indent = false;
            self.write_eol()?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.indent = self.indent.saturating_sub(self.indent_size);
        if !self.defer_indent {
            self.write_eol()?;
        }
        self.defer_indent = false;
        Ok(())
    }
}

impl<W: Write> Encoder for PrettyEncoder<W> {
    type Error = io::Error;

    fn write_null(&mut self) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_null()
    }

    fn write_boolean(&mut self, value: bool) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_boolean(value)
    }

    fn write_integer(&mut self, value: i64) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_integer(value)
    }

    fn write_decimal(&mut self, value: f64) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_decimal(value)
    }

    fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_string(value)
    }

    fn write_array_begin(&mut self) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_array_begin()?;
        self.indent += self.indent_size;
        self.defer_indent = true;
        Ok(())
    }

    fn write_array_end(&mut self) -> io::Result<()> {
        self.close()?;
        self.inner.write_array_end()
    }

    fn write_array_delimiter(&mut self) -> io::Result<()> {
        self.inner.write_array_delimiter()?;
        self.write_eol()
    }

    fn write_object_begin(&mut self) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_object_begin()?;
        self.indent += self.indent_size;
        self.defer_indent = true;
        Ok(())
    }

    fn write_object_end(&mut self) -> io::Result<()> {
        self.close()?;
        self.inner.write_object_end()
    }

    fn write_object_delimiter(&mut self) -> io::Result<()> {
        self.inner.write_object_delimiter()?;
        self.defer_indent = true;
        Ok(())
    }

    fn write_object_key(&mut self, key: &str) -> io::Result<()> {
        self.write_prefix()?;
        self.inner.write_object_key(key)?;
        self.inner.out.write_all(b" ")
    }
}

fn into_string(bytes: Vec<u8>) -> String {
    // Encoders only ever emit UTF-8.
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Compact JSON text for `value`.
#[must_use]
pub fn to_string(value: &Value) -> String {
    let mut encoder = CompactEncoder::new(Vec::new());
    // Writing into a Vec cannot fail.
    let _ = encoder.encode(value);
    into_string(encoder.into_inner())
}

/// Indented JSON text for `value`, two spaces per level.
#[must_use]
pub fn to_string_pretty(value: &Value) -> String {
    let mut encoder = PrettyEncoder::new(Vec::new());
    let _ = encoder.encode(value);
    into_string(encoder.into_inner())
}

/// Writes compact JSON text for `value` to `out`.
pub fn to_writer<W: Write>(out: W, value: &Value) -> io::Result<()> {
    CompactEncoder::new(out).encode(value)
}

pub fn to_writer_pretty<W: Write>(out: W, value: &Value) -> io::Result<()> {
    PrettyEncoder::new(out).encode(value)
}
