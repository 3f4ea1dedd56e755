//! String interning and the four-way symbol encoding (spec.md §3.3, §7 in
//! the component table as C7).
//!
//! Grounded on the teacher's `intern.rs`, which stores identifier and
//! literal text once in a table and hands out small indices instead of
//! cloning strings at every use site. We keep that "intern repeated text"
//! idea for the lexer/parser (`Interner`), but the symbol encoding itself
//! is new: spec.md wants four *observably different* representations for
//! a bound name (out-of-place name, in-place tiny string, direct entry
//! pointer, argument-offset index), which the teacher's uniform
//! slot-index scheme has no equivalent for (Python name resolution is
//! fully static, so it never needs a late-bound, name-based fallback).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::datum::Datum;

/// Maximum byte length a symbol name may carry inline, standing in for
/// spec.md §3.3's "up to `word_size - 1` bytes packed into the payload".
/// Real bit-packing into a machine word is, per spec.md §9, "an
/// optimization, not a requirement" in a language without raw pointer
/// manipulation; this constant exists so the in-place encoding remains a
/// real, distinct, allocation-free representation rather than a type-only
/// stand-in for it.
pub const INLINE_SYMBOL_CAPACITY: usize = 23;

/// A symbol name of at most [`INLINE_SYMBOL_CAPACITY`] bytes stored
/// without a heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InlineSymbol {
    len: u8,
    bytes: [u8; INLINE_SYMBOL_CAPACITY],
}

impl InlineSymbol {
    pub fn try_new(name: &str) -> Option<Self> {
        if name.len() > INLINE_SYMBOL_CAPACITY {
            return None;
        }
        let mut bytes = [0u8; INLINE_SYMBOL_CAPACITY];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Some(Self { len: name.len() as u8, bytes })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        // Safety net: constructed only from a valid `&str` slice, so the
        // stored bytes are always valid UTF-8 up to `len`.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

/// A mutable environment entry cell. Stable across hashmap rehashes
/// because `locals` stores the `Rc` itself, not a reference into the map.
pub type EntryCell = Rc<RefCell<Datum>>;

/// The four symbol encodings of spec.md §3.3.
///
/// Every variant stores `name` alongside its encoding-specific resolution
/// state so that `name()` never needs an environment, simplifying on
/// spec.md's "accessor ... [, env]" to an unconditional accessor while
/// keeping identical resolution semantics for `evaluate_symbol`.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// `00`: out-of-place, name held via a heap-allocated `Rc<str>`.
    /// Resolved by a name-lookup walk through the environment chain.
    OutOfPlace(Rc<str>),
    /// `01`: in-place tiny string, inline bytes, no heap allocation.
    /// Resolved the same way as `OutOfPlace`.
    InPlace(InlineSymbol),
    /// `10`: entry pointer, a direct reference to a resolved environment
    /// entry. Resolved by dereferencing directly, no chain walk.
    EntryPointer { name: Rc<str>, entry: EntryCell },
    /// `11`: argument offset, an index into the current environment's
    /// `arguments` view. Resolved by direct indexing, no hash lookup.
    ArgumentOffset { name: Rc<str>, offset: u16 },
}

impl Symbol {
    #[must_use]
    pub fn new_out_of_place(name: &str, interner: &mut Interner) -> Self {
        InlineSymbol::try_new(name).map_or_else(|| Self::OutOfPlace(interner.intern(name)), Self::InPlace)
    }

    #[must_use]
    pub fn name(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::OutOfPlace(s) => std::borrow::Cow::Borrowed(s.as_ref()),
            Self::InPlace(inline) => std::borrow::Cow::Owned(inline.as_str().to_owned()),
            Self::EntryPointer { name, .. } | Self::ArgumentOffset { name, .. } => {
                std::borrow::Cow::Borrowed(name.as_ref())
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// Deduplicates repeated identifier/literal text seen during lexing and
/// parsing, grounded on the teacher's `intern.rs` interning table.
#[derive(Debug, Default)]
pub struct Interner {
    table: AHashMap<Box<str>, Rc<str>>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Rc<str> {
        if let Some(existing) = self.table.get(text) {
            return Rc::clone(existing);
        }
        let rc: Rc<str> = Rc::from(text);
        self.table.insert(Box::from(text), Rc::clone(&rc));
        rc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_symbol_round_trips_short_names() {
        let inline = InlineSymbol::try_new("loop").unwrap();
        assert_eq!(inline.as_str(), "loop");
    }

    #[test]
    fn inline_symbol_rejects_long_names() {
        let long_name = "x".repeat(INLINE_SYMBOL_CAPACITY + 1);
        assert!(InlineSymbol::try_new(&long_name).is_none());
    }

    #[test]
    fn interner_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("hello-world-this-is-long-enough");
        let b = interner.intern("hello-world-this-is-long-enough");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn all_encodings_report_the_same_name() {
        let mut interner = Interner::new();
        let out_of_place = Symbol::new_out_of_place("hello-world-this-is-long-enough", &mut interner);
        let in_place = Symbol::new_out_of_place("short", &mut interner);
        let entry = Symbol::EntryPointer {
            name: Rc::from("short"),
            entry: Rc::new(RefCell::new(Datum::Nil)),
        };
        let arg = Symbol::ArgumentOffset { name: Rc::from("short"), offset: 0 };
        assert_eq!(out_of_place.name(), "hello-world-this-is-long-enough");
        assert_eq!(in_place.name(), "short");
        assert_eq!(entry.name(), "short");
        assert_eq!(arg.name(), "short");
    }
}
