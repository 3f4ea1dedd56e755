//! Error model for lexing, parsing, and evaluation.
//!
//! Grounded on the teacher's `exception_private.rs` split between an
//! internal-bug variant and a catchable-by-the-language variant. Our
//! language has no `try`/`except`, so there is only one "catchable" shape:
//! the outermost `evaluate()` call, which always converts a signal into a
//! returned `error` datum (spec.md §7).

use std::borrow::Cow;
use std::fmt;

use crate::datum::Datum;

/// Result alias for operations that can signal an error.
pub type EvalResult<T> = Result<T, RunError>;

/// Where a lex/parse error's span begins and ends, in absolute byte
/// offsets plus 1-based line/column, per spec.md §3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_offset: u32,
    pub end_offset: u32,
    pub begin_line: u32,
    pub begin_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// Lex and parse error categories, named after spec.md §4.2/§4.3's error
/// taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SyntaxErrorKind {
    Eof,
    BadToken,
    NotAValue,
    InvalidString,
    InvalidNumber,
    InvalidBase64,
    InvalidTemporal,
    IncompleteComment,
    IncompleteArray,
    IncompleteList,
    IncompletePair,
    PairSuffix,
    ErrorWrongLength,
    ErrorBadCode,
    UdtTypeCollidesWithReservedRange,
    UdtWrongShape,
    UnterminatedQuoteLike,
    MapKeyKindMismatch,
}

/// A lex or parse failure, carrying the offending span per spec.md §4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.kind, self.span.begin_line, self.span.begin_col, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Runtime error raised during evaluation.
///
/// - `Internal`: a bug in this interpreter, never expected from
///   well-formed input.
/// - `Signal`: the unwinding channel spec.md §7 describes — either an
///   evaluator-produced `error` datum (unbound variable, type mismatch,
///   arity mismatch, ...) or an arbitrary datum passed to `(raise x)`,
///   propagated verbatim.
#[derive(Debug, Clone)]
pub enum RunError {
    Internal(Cow<'static, str>),
    Signal(Datum),
}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Builds the evaluator's standard `error(code, message)` datum and
    /// wraps it as a signal, per spec.md §4.4's "fail with error datum
    /// (code -1, descriptive message)" convention (code -1 is used for
    /// every evaluator-raised category unless a specific code is given).
    pub fn signal(code: i32, message: impl Into<String>) -> Self {
        Self::Signal(Datum::error(code, message.into()))
    }

    /// Converts this error into the datum the outermost `evaluate()` call
    /// returns, per spec.md §4.8.1 and §7. Internal bugs still surface as
    /// an error datum (code `-2`) rather than panicking the host.
    #[must_use]
    pub fn into_datum(self) -> Datum {
        match self {
            Self::Signal(datum) => datum,
            Self::Internal(msg) => Datum::error(-2, format!("internal interpreter error: {msg}")),
        }
    }
}

impl From<SyntaxError> for RunError {
    fn from(err: SyntaxError) -> Self {
        Self::signal(-1, err.to_string())
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Signal(datum) => write!(f, "{datum:?}"),
        }
    }
}

impl std::error::Error for RunError {}
