//! The universal tagged value type (spec.md §3.1, the C1 component).
//!
//! Grounded on the teacher's `value.rs` `Value` enum: immediate variants
//! stored inline, compound variants stored behind a handle. Where the
//! teacher indexes into an arena (`Value::Ref(HeapId)`) because its
//! values may need to out-live a serialization round-trip and must stay
//! reference-counted manually, we use `Rc` directly for every compound
//! variant: spec.md §3.6 permits "reference-counted pointers" as a valid
//! memory policy, and spec.md §9 guarantees the evaluator never builds a
//! cycle, so plain `Rc` never leaks without a collector pass. The one
//! case that genuinely needs [`crate::heap::Heap`]'s arena is a host's own
//! opaque user-defined payload (`UserDefined::Opaque`), which this crate
//! cannot give a typed shape to.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

use crate::environment::Environment;
use crate::external::{Decimal64, DatetimeInterval};
use crate::heap::HeapId;
use crate::intern::{EntryCell, Symbol};
use crate::persistent_set::PersistentSet;

/// An `(code, message)` pair, spec.md §3.1's `error` variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    pub code: i32,
    pub message: Rc<str>,
}

/// The two cells of a `pair`, spec.md §3.1. Never mutated after
/// construction (no `set-car!`/`set-cdr!` exists in this language) and
/// never cyclic (spec.md §3.1 invariant), so a bare `Rc` is enough.
#[derive(Debug, Clone, PartialEq)]
pub struct PairNode {
    pub first: Datum,
    pub second: Datum,
}

/// A closure: parameters, a pre-resolved body, and the environment it
/// closed over. See spec.md §3.1 and §4.8.5.
#[derive(Clone)]
pub struct Procedure {
    pub positional_parameters: Vec<Rc<str>>,
    pub rest_parameter: Option<Rc<str>>,
    /// Non-empty; every form has already been through partial resolution
    /// (spec.md §4.8.6) at construction time.
    pub body: Vec<Datum>,
    pub captured_environment: Rc<RefCell<Environment>>,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("positional_parameters", &self.positional_parameters)
            .field("rest_parameter", &self.rest_parameter)
            .finish_non_exhaustive()
    }
}

/// A native (host-supplied) procedure, per spec.md §6.3's calling
/// convention: it consumes an argument vector and, on success, resizes it
/// to length 1 holding the result.
pub type NativeFn = dyn Fn(
    &mut Vec<Datum>,
    &mut Rc<RefCell<Environment>>,
    i32,
    &mut crate::run::Interpreter,
) -> crate::error::EvalResult<()>;

#[derive(Clone)]
pub struct NativeProcedure {
    pub name: Rc<str>,
    pub func: Rc<NativeFn>,
}

impl std::fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#<native {}>", self.name)
    }
}

impl PartialEq for NativeProcedure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

/// Special-form tags recognized during pair dispatch (spec.md §3.1): the
/// six named there, `LAMBDA, DEFINE, SET!, IF, QUOTE, UNDEFINED` (matching
/// `original_source/.../lspcore_builtins.h`'s `Builtin` enum plus the
/// spec's own addition of `IF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Builtin {
    #[strum(serialize = "lambda")]
    Lambda,
    #[strum(serialize = "define")]
    Define,
    #[strum(serialize = "set!")]
    SetBang,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "quote")]
    Quote,
    /// Sentinel bound value marking a `define`d slot that has not yet been
    /// assigned. Never observable as an ordinary value; reading it is the
    /// "referenced before it was defined" error (spec.md §4.8.3).
    Undefined,
}

/// The six reserved user-defined encodings (spec.md §3.1), plus an
/// `Opaque` catch-all for host-defined type codes outside the reserved
/// range `T..T+6`.
#[derive(Debug, Clone)]
pub enum UserDefined {
    Pair(Rc<PairNode>),
    Symbol(Symbol),
    Procedure(Rc<Procedure>),
    NativeProcedure(NativeProcedure),
    Set(PersistentSet),
    Builtin(Builtin),
    /// A host type code outside `T..T+6`. The payload is genuinely
    /// opaque to us, so it lives in the [`crate::heap::Heap`] arena.
    Opaque { type_code: i32, payload: HeapId },
}

/// The universal tagged value (spec.md §3.1).
#[derive(Debug, Clone)]
pub enum Datum {
    Nil,
    Integer(i32),
    Integer64(i64),
    Double(f64),
    Decimal64(Decimal64),
    Boolean(bool),
    String(Rc<str>),
    Binary(Rc<[u8]>),
    Error(Rc<ErrorData>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DatetimeInterval(DatetimeInterval),
    Array(Rc<Vec<Datum>>),
    MapString(Rc<IndexMap<Rc<str>, Datum>>),
    MapInt(Rc<IndexMap<i32, Datum>>),
    UserDefined(UserDefined),
}

impl Datum {
    #[must_use]
    pub fn error(code: i32, message: impl Into<Rc<str>>) -> Self {
        Self::Error(Rc::new(ErrorData { code, message: message.into() }))
    }

    #[must_use]
    pub fn pair(first: Self, second: Self) -> Self {
        Self::UserDefined(UserDefined::Pair(Rc::new(PairNode { first, second })))
    }

    /// Builds a proper list from `items`, nil-terminated.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Self, IntoIter: DoubleEndedIterator>) -> Self {
        items.into_iter().rev().fold(Self::Nil, |tail, item| Self::pair(item, tail))
    }

    #[must_use]
    pub fn symbol(sym: Symbol) -> Self {
        Self::UserDefined(UserDefined::Symbol(sym))
    }

    #[must_use]
    pub fn builtin(b: Builtin) -> Self {
        Self::UserDefined(UserDefined::Builtin(b))
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    #[must_use]
    pub fn as_pair(&self) -> Option<&PairNode> {
        match self {
            Self::UserDefined(UserDefined::Pair(p)) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::UserDefined(UserDefined::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    /// `false` is the only falsy value (spec.md §4.8.7's `if`: "If it
    /// equals boolean `false`"); everything else, including `nil` and
    /// `0`, is truthy.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self, Self::Boolean(false))
    }

    /// Iterates a proper list's elements, yielding `None` (via the
    /// caller checking the trailing bool) if the list is improper.
    #[must_use]
    pub fn iter_list(&self) -> ListIter<'_> {
        ListIter { cursor: self }
    }

    /// Collects a proper list into a `Vec`, failing if it is improper.
    pub fn proper_list_to_vec(&self) -> Result<Vec<Self>, &'static str> {
        let mut out = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Self::Nil => return Ok(out),
                Self::UserDefined(UserDefined::Pair(p)) => {
                    out.push(p.first.clone());
                    cursor = &p.second;
                }
                _ => return Err("expected a proper list"),
            }
        }
    }

    /// The datum variant's tag rank, used by the standard comparator
    /// (spec.md §4.5) to order first by variant before by value.
    fn variant_rank(&self) -> u8 {
        match self {
            Self::Nil => 0,
            Self::Integer(_) | Self::Integer64(_) | Self::Double(_) | Self::Decimal64(_) => 1,
            Self::Boolean(_) => 2,
            Self::String(_) => 3,
            Self::Binary(_) => 4,
            Self::Error(_) => 5,
            Self::Date(_) => 6,
            Self::Time(_) => 7,
            Self::DateTime(_) => 8,
            Self::DatetimeInterval(_) => 9,
            Self::Array(_) => 10,
            Self::MapString(_) => 11,
            Self::MapInt(_) => 12,
            Self::UserDefined(u) => 13 + user_defined_rank(u),
        }
    }
}

fn user_defined_rank(u: &UserDefined) -> u8 {
    match u {
        UserDefined::Pair(_) => 0,
        UserDefined::Symbol(_) => 1,
        UserDefined::Procedure(_) => 2,
        UserDefined::NativeProcedure(_) => 3,
        UserDefined::Set(_) => 4,
        UserDefined::Builtin(_) => 5,
        UserDefined::Opaque { .. } => 6,
    }
}

pub struct ListIter<'a> {
    cursor: &'a Datum,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Datum;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Datum::UserDefined(UserDefined::Pair(p)) => {
                let item = &p.first;
                self.cursor = &p.second;
                Some(item)
            }
            _ => None,
        }
    }
}

/// Rank used for variant ordering when the two values are both numeric
/// (numeric kinds compare by promoted value, not by tag rank, so they
/// share a rank but are ordered within [`compare_numeric`]).
#[must_use]
pub fn variant_rank_for_ordering(datum: &Datum) -> u8 {
    datum.variant_rank()
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        crate::builtins::equality::structural_eq(self, other)
    }
}

/// The standard comparator (spec.md §4.5): orders first by variant tag,
/// then within a variant by value, with numeric cross-kind promotion.
#[must_use]
pub fn before(a: &Datum, b: &Datum) -> Ordering {
    crate::builtins::comparator::before(a, b)
}
