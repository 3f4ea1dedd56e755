//! Partial resolution: the ahead-of-time symbol rewrite applied to a λ
//! body at procedure-construction time (spec.md §4.8.6, part of C8).
//!
//! Grounded on the teacher's `prepare.rs`, which walks a function body
//! once at definition time to resolve names into fast slots before the
//! body ever runs; the rewrite rules here are spec.md's four-way symbol
//! encoding instead of the teacher's single slot-index scheme.

use std::cell::RefCell;
use std::rc::Rc;

use crate::datum::{Builtin, Datum, PairNode, UserDefined};
use crate::environment::Environment;
use crate::intern::Symbol;

/// Rewrites every symbol in `form` to the cheapest equivalent encoding
/// reachable from `positional`/`rest` (argument-offset) or `defining_env`
/// (entry-pointer), recursing into sub-forms except where spec.md §4.8.6
/// carves out `lambda`/`quote` (no recursion into their tails) and
/// `define`/`set!` (first argument, the name slot, is left untouched).
pub fn resolve_body_form(form: &Datum, positional: &[Rc<str>], rest: Option<&Rc<str>>, defining_env: &Rc<RefCell<Environment>>) -> Datum {
    match form {
        Datum::Array(items) => {
            Datum::Array(Rc::new(items.iter().map(|i| resolve_body_form(i, positional, rest, defining_env)).collect()))
        }
        Datum::MapString(map) => Datum::MapString(Rc::new(
            map.iter().map(|(k, v)| (Rc::clone(k), resolve_body_form(v, positional, rest, defining_env))).collect(),
        )),
        Datum::MapInt(map) => Datum::MapInt(Rc::new(
            map.iter().map(|(k, v)| (*k, resolve_body_form(v, positional, rest, defining_env))).collect(),
        )),
        Datum::UserDefined(UserDefined::Symbol(sym)) => {
            Datum::symbol(resolve_symbol(sym, positional, rest, defining_env))
        }
        Datum::UserDefined(UserDefined::Pair(pair)) => resolve_pair(pair, positional, rest, defining_env),
        _ => form.clone(),
    }
}

fn resolve_symbol(sym: &Symbol, positional: &[Rc<str>], rest: Option<&Rc<str>>, defining_env: &Rc<RefCell<Environment>>) -> Symbol {
    let name = sym.name();
    if let Some(offset) = positional.iter().position(|p| p.as_ref() == name.as_ref()) {
        return Symbol::ArgumentOffset { name: Rc::from(name.as_ref()), offset: offset as u16 };
    }
    if let Some(rest_name) = rest {
        if rest_name.as_ref() == name.as_ref() {
            return Symbol::ArgumentOffset { name: Rc::clone(rest_name), offset: positional.len() as u16 };
        }
    }
    if let Some(entry) = Environment::lookup(defining_env, &name) {
        return Symbol::EntryPointer { name: Rc::from(name.as_ref()), entry };
    }
    sym.clone()
}

fn head_builtin(pair: &PairNode) -> Option<Builtin> {
    match &pair.first {
        Datum::UserDefined(UserDefined::Builtin(b)) => Some(*b),
        Datum::UserDefined(UserDefined::Symbol(sym)) => match sym.name().as_ref() {
            "lambda" | "\u{3bb}" => Some(Builtin::Lambda),
            "define" => Some(Builtin::Define),
            "set!" => Some(Builtin::SetBang),
            "quote" => Some(Builtin::Quote),
            "if" => Some(Builtin::If),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_pair(pair: &PairNode, positional: &[Rc<str>], rest: Option<&Rc<str>>, defining_env: &Rc<RefCell<Environment>>) -> Datum {
    let resolved_first = resolve_body_form(&pair.first, positional, rest, defining_env);
    match head_builtin(pair) {
        Some(Builtin::Lambda | Builtin::Quote) => Datum::pair(resolved_first, pair.second.clone()),
        Some(Builtin::Define | Builtin::SetBang) => match pair.second.as_pair() {
            // `name_pair.first` is the name slot (left untouched); its own
            // `second` (the `(value)` remainder) recurses normally, which
            // resolves `value` without any special-casing.
            Some(name_pair) => Datum::pair(
                resolved_first,
                Datum::pair(name_pair.first.clone(), resolve_body_form(&name_pair.second, positional, rest, defining_env)),
            ),
            None => Datum::pair(resolved_first, pair.second.clone()),
        },
        _ => Datum::pair(resolved_first, resolve_body_form(&pair.second, positional, rest, defining_env)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    fn sym(name: &str, interner: &mut Interner) -> Datum {
        Datum::symbol(Symbol::new_out_of_place(name, interner))
    }

    #[test]
    fn positional_parameter_becomes_argument_offset() {
        let mut interner = Interner::new();
        let env = Environment::root();
        let form = sym("x", &mut interner);
        let resolved = resolve_body_form(&form, &[Rc::from("x")], None, &env);
        assert!(matches!(resolved.as_symbol().unwrap(), Symbol::ArgumentOffset { offset: 0, .. }));
    }

    #[test]
    fn global_binding_becomes_entry_pointer() {
        let mut interner = Interner::new();
        let env = Environment::root();
        Environment::define(&env, Rc::from("g"), Datum::Integer(1));
        let form = sym("g", &mut interner);
        let resolved = resolve_body_form(&form, &[], None, &env);
        assert!(matches!(resolved.as_symbol().unwrap(), Symbol::EntryPointer { .. }));
    }

    #[test]
    fn unbound_global_stays_name_based() {
        let mut interner = Interner::new();
        let env = Environment::root();
        let form = sym("later-defined", &mut interner);
        let resolved = resolve_body_form(&form, &[], None, &env);
        assert!(matches!(resolved.as_symbol().unwrap(), Symbol::OutOfPlace(_) | Symbol::InPlace(_)));
    }

    #[test]
    fn nested_lambda_tail_is_not_recursed_into() {
        let mut interner = Interner::new();
        let env = Environment::root();
        Environment::define(&env, Rc::from("g"), Datum::Integer(1));
        let inner_lambda =
            Datum::list(vec![Datum::builtin(Builtin::Lambda), Datum::Nil, sym("g", &mut interner)]);
        let resolved = resolve_body_form(&inner_lambda, &[], None, &env);
        let items = resolved.proper_list_to_vec().unwrap();
        // The inner lambda's own body (`g`) must be untouched here; it is
        // resolved later, when that nested lambda is itself evaluated.
        assert!(matches!(items[2].as_symbol().unwrap(), Symbol::OutOfPlace(_) | Symbol::InPlace(_)));
    }
}
