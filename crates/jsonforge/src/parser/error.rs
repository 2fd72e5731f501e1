use std::{
    fmt::{self, Write as _},
    io,
};

use thiserror::Error;

use crate::value::Value;

/// One diagnostic recorded while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based byte column of the offending token within its line.
    pub column: usize,
    /// Byte offset of the offending token from the start of input.
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "At line {}:{} (char {}): {}",
            self.line, self.column, self.offset, self.message
        )
    }
}

/// Parsing failed.
///
/// Carries every recorded [`Problem`] (up to
/// [`ParseOptions::max_failures`](crate::ParseOptions::max_failures)) and the
/// value the parser managed to build despite them.
#[derive(Debug, Error)]
#[error("{}", render(.problems, .io.as_ref()))]
pub struct ParseError {
    pub problems: Vec<Problem>,
    /// Best-effort result. `null` when parsing stopped early.
    pub partial_result: Value,
    /// The reader failed; parsing stopped at that point.
    #[source]
    pub io: Option<io::Error>,
}

fn render(problems: &[Problem], io: Option<&io::Error>) -> String {
    let mut out = String::new();
    for (i, problem) in problems.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{problem}");
    }
    if let Some(io) = io {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "Error reading input: {io}");
    }
    out
}

impl ParseError {
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    #[must_use]
    pub fn partial_result(&self) -> &Value {
        &self.partial_result
    }

    #[must_use]
    pub fn into_partial_result(self) -> Value {
        self.partial_result
    }
}
