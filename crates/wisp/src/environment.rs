//! Lexical environments (spec.md §3.2, the C6 component).
//!
//! Grounded on the teacher's `namespace.rs` parent-chain lookup, but the
//! teacher resolves every name through a slot vector computed ahead of
//! time for a whole module; this interpreter instead follows spec.md §3.2
//! literally (a hashmap of locals plus an optional parent, plus an
//! `arguments` view for offset-based access) because the four-way symbol
//! encoding in [`crate::intern`] already provides the fast paths the
//! teacher gets from its slot vector, at the symbol rather than the
//! environment.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use crate::datum::Datum;
use crate::intern::EntryCell;

/// A single lexical scope: a frame of `define`d/bound names, an optional
/// enclosing scope, and the positional arguments a procedure call bound
/// here (consulted by [`crate::intern::Symbol::ArgumentOffset`]).
pub struct Environment {
    locals: AHashMap<Rc<str>, EntryCell>,
    parent: Option<Rc<RefCell<Environment>>>,
    arguments: Vec<EntryCell>,
    /// Set once a closure captures this environment (spec.md §4.8.5's
    /// "was this environment ever captured"). Gates the tail-call
    /// environment-reuse optimization in `invoke_procedure`: a procedure
    /// may only clobber its own activation record in place if nothing
    /// else might still be holding onto it.
    was_referenced: Cell<bool>,
}

impl Environment {
    #[must_use]
    pub fn root() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            locals: AHashMap::new(),
            parent: None,
            arguments: Vec::new(),
            was_referenced: Cell::new(false),
        }))
    }

    #[must_use]
    pub fn child_with_arguments(parent: Rc<RefCell<Self>>, arguments: Vec<EntryCell>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            locals: AHashMap::new(),
            parent: Some(parent),
            arguments,
            was_referenced: Cell::new(false),
        }))
    }

    /// Looks up `name` by walking this environment's parent chain,
    /// spec.md §4.8.3's "search outward through each enclosing
    /// environment" used by [`crate::intern::Symbol::OutOfPlace`] and
    /// [`crate::intern::Symbol::InPlace`].
    #[must_use]
    pub fn lookup(env: &Rc<RefCell<Self>>, name: &str) -> Option<EntryCell> {
        let this = env.borrow();
        if let Some(cell) = this.locals.get(name) {
            return Some(Rc::clone(cell));
        }
        match &this.parent {
            Some(parent) => Self::lookup(parent, name),
            None => None,
        }
    }

    /// Binds `name` in this frame. If `name` is already bound here, the
    /// existing entry is returned unchanged (`inserted = false`) per
    /// spec.md §4.6 — a repeated top-level `define` of the same name is
    /// not an overwrite through this path; callers that want overwrite
    /// semantics use [`Self::define_or_redefine`].
    pub fn define(env: &Rc<RefCell<Self>>, name: Rc<str>, value: Datum) -> (EntryCell, bool) {
        if let Some(existing) = env.borrow().locals.get(name.as_ref()) {
            return (Rc::clone(existing), false);
        }
        let cell = Rc::new(RefCell::new(value));
        env.borrow_mut().locals.insert(name, Rc::clone(&cell));
        (cell, true)
    }

    /// Redefines `name` in place if it already exists in this exact
    /// frame, otherwise defines it fresh. `define` in this language may
    /// be repeated at the same scope (spec.md §4.8.3).
    pub fn define_or_redefine(env: &Rc<RefCell<Self>>, name: Rc<str>, value: Datum) -> EntryCell {
        if let Some(existing) = env.borrow().locals.get(name.as_ref()) {
            *existing.borrow_mut() = value;
            return Rc::clone(existing);
        }
        Self::define(env, name, value)
    }

    /// Replaces the `arguments` side-view wholesale, used once per
    /// invocation after every parameter has been (re)bound into `locals`.
    pub fn set_arguments(env: &Rc<RefCell<Self>>, arguments: Vec<EntryCell>) {
        env.borrow_mut().arguments = arguments;
    }

    pub fn argument(env: &Rc<RefCell<Self>>, offset: u16) -> Option<Datum> {
        env.borrow().arguments.get(offset as usize).map(|cell| cell.borrow().clone())
    }

    /// Drops this frame's own bindings and reparents it onto
    /// `new_parent`. Used by `invoke_procedure`'s environment-reuse path
    /// (spec.md §4.8.5) to recycle an activation record that nothing
    /// else references instead of allocating a new one for the next
    /// tail call — reparenting matters because a tail call's callee may
    /// be a different procedure with a different closure scope.
    pub fn clear_locals(env: &Rc<RefCell<Self>>, new_parent: Rc<RefCell<Self>>, arguments: Vec<EntryCell>) {
        let mut this = env.borrow_mut();
        this.locals.clear();
        this.parent = Some(new_parent);
        this.arguments = arguments;
    }

    pub fn mark_as_referenced(env: &Rc<RefCell<Self>>) {
        env.borrow().was_referenced.set(true);
    }

    #[must_use]
    pub fn is_referenced(env: &Rc<RefCell<Self>>) -> bool {
        env.borrow().was_referenced.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Environment::root();
        Environment::define(&root, Rc::from("x"), Datum::Integer(1));
        let child = Environment::child_with_arguments(Rc::clone(&root), Vec::new());
        let found = Environment::lookup(&child, "x").expect("should find x in parent");
        assert!(matches!(*found.borrow(), Datum::Integer(1)));
    }

    #[test]
    fn define_repeated_name_keeps_existing_entry() {
        let root = Environment::root();
        let (first, inserted_first) = Environment::define(&root, Rc::from("x"), Datum::Integer(1));
        let (second, inserted_second) = Environment::define(&root, Rc::from("x"), Datum::Integer(2));
        assert!(inserted_first);
        assert!(!inserted_second);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(matches!(*first.borrow(), Datum::Integer(1)), "define must not overwrite an existing binding");
    }

    #[test]
    fn lookup_misses_return_none() {
        let root = Environment::root();
        assert!(Environment::lookup(&root, "missing").is_none());
    }

    #[test]
    fn define_or_redefine_reuses_existing_cell() {
        let root = Environment::root();
        let (first, _) = Environment::define(&root, Rc::from("x"), Datum::Integer(1));
        let second = Environment::define_or_redefine(&root, Rc::from("x"), Datum::Integer(2));
        assert!(Rc::ptr_eq(&first, &second));
        assert!(matches!(*first.borrow(), Datum::Integer(2)));
    }

    #[test]
    fn clear_locals_drops_bindings_and_reparents() {
        let root = Environment::root();
        let other_root = Environment::root();
        let child = Environment::child_with_arguments(Rc::clone(&root), Vec::new());
        Environment::define(&child, Rc::from("y"), Datum::Integer(9));
        Environment::clear_locals(&child, Rc::clone(&other_root), Vec::new());
        assert!(Environment::lookup(&child, "y").is_none());
        Environment::define(&root, Rc::from("z"), Datum::Integer(3));
        assert!(Environment::lookup(&child, "z").is_none(), "child must no longer see the old parent");
        Environment::define(&other_root, Rc::from("w"), Datum::Integer(7));
        assert!(Environment::lookup(&child, "w").is_some(), "child must see the new parent");
    }
}
