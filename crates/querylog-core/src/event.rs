//! Raw "query executed" events as handed over by the host's data-access layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

/// One placeholder value. Numbers stay numbers on disk, everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Binding {
    /// Whether the binding renders unquoted.
    pub fn is_numeric(&self) -> bool {
        match self {
            Binding::Int(_) => true,
            Binding::Float(f) => f.is_finite(),
            Binding::Text(s) => looks_numeric(s),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Int(i) => write!(f, "{i}"),
            Binding::Float(x) => write!(f, "{x}"),
            Binding::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Binding {
    fn from(v: i64) -> Self { Binding::Int(v) }
}

impl From<i32> for Binding {
    fn from(v: i32) -> Self { Binding::Int(v.into()) }
}

impl From<u32> for Binding {
    fn from(v: u32) -> Self { Binding::Int(v.into()) }
}

impl From<f64> for Binding {
    fn from(v: f64) -> Self { Binding::Float(v) }
}

impl From<&str> for Binding {
    fn from(v: &str) -> Self { Binding::Text(v.to_string()) }
}

impl From<String> for Binding {
    fn from(v: String) -> Self { Binding::Text(v) }
}

/// Finite decimal literal: optional sign, digits with an optional fraction, optional exponent.
/// Surrounding whitespace is ignored; "inf"/"nan" spellings are not numbers here.
fn looks_numeric(s: &str) -> bool {
    let s = s.trim();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);

    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && all_digits(exp)
        }
    }
}

/// One entry of the call stack at the moment a query fired, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackFrame {
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self { file: Some(file.into()), line: Some(line) }
    }
}

impl From<&Location<'_>> for StackFrame {
    fn from(location: &Location<'_>) -> Self {
        StackFrame::new(location.file(), location.line())
    }
}

/// A query that just finished executing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExecuted {
    pub sql: String,
    pub bindings: Vec<Binding>,
    pub duration_ms: f64,
    pub connection: String,
    pub stack: Vec<StackFrame>,
}

impl QueryExecuted {
    /// Build an event whose stack is the caller's source location.
    ///
    /// Mark the data-access helpers between the application and this call with
    /// `#[track_caller]` and the recorded location becomes the application line
    /// that issued the query.
    #[track_caller]
    pub fn new(
        sql: impl Into<String>,
        bindings: Vec<Binding>,
        duration_ms: f64,
        connection: impl Into<String>,
    ) -> Self {
        let caller = Location::caller();
        Self {
            sql: sql.into(),
            bindings,
            duration_ms,
            connection: connection.into(),
            stack: vec![StackFrame::from(caller)],
        }
    }

    /// Replace the captured frames with a host-supplied trace.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }
}
