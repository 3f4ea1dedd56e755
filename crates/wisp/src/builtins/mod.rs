//! Native procedure library (spec.md §4.5, the C9 component) plus the
//! special-form bindings every evaluated program needs in scope.
//!
//! Each native is registered as a [`crate::datum::NativeProcedure`]
//! honoring the calling convention of spec.md §6.3: consume an argument
//! vector, then resize it to length 1 holding the result. Pure functions
//! of their arguments (arithmetic, pairs, equality, sets) are written
//! against a plain `&[Datum] -> EvalResult<Datum>` signature and adapted
//! to that convention by [`wrap`]; `apply` and `raise` need the evaluator
//! and environment directly, so they are written against the full native
//! signature.
//!
//! `install` also binds the special forms (spec.md §3.1's `Builtin` tags)
//! into the global environment, mirroring
//! `original_source/.../lspcore_interpreter.cpp`'s `defineBuiltin`/
//! `defineBuiltins`: the name a special form is looked up under has to be
//! an ordinary global binding like any other, or `evaluate_symbol` never
//! finds it.

pub mod arithmetic;
pub mod comparator;
pub mod equality;
pub mod pairs;
pub mod sets;

use std::cell::RefCell;
use std::rc::Rc;

use crate::datum::{Datum, NativeProcedure};
use crate::environment::Environment;
use crate::error::{EvalResult, RunError};
use crate::run::Interpreter;

fn wrap(name: &'static str, f: fn(&[Datum]) -> EvalResult<Datum>) -> NativeProcedure {
    NativeProcedure {
        name: Rc::from(name),
        func: Rc::new(move |args, _env, _type_offset, _interp| {
            let result = f(args)?;
            args.clear();
            args.push(result);
            Ok(())
        }),
    }
}

fn wrap_infallible(name: &'static str, f: fn(&[Datum]) -> Datum) -> NativeProcedure {
    wrap(name, move |args| Ok(f(args)))
}

fn apply_native() -> NativeProcedure {
    NativeProcedure {
        name: Rc::from("apply"),
        func: Rc::new(|args, env, type_offset, interp| {
            let [procedure, list_arg] = &args[..] else {
                return Err(RunError::signal(-1, format!("apply takes 2 arguments, was invoked with {}", args.len())));
            };
            let items = list_arg
                .proper_list_to_vec()
                .map_err(|_| RunError::signal(-1, "apply: second argument must be a proper list"))?;
            let result = interp.apply_value(procedure, &items, env, type_offset)?;
            args.clear();
            args.push(result);
            Ok(())
        }),
    }
}

fn raise_native() -> NativeProcedure {
    NativeProcedure {
        name: Rc::from("raise"),
        func: Rc::new(|args, _env, _type_offset, _interp| {
            let [value] = &args[..] else {
                return Err(RunError::signal(-1, format!("raise takes 1 argument, was invoked with {}", args.len())));
            };
            Err(RunError::Signal(value.clone()))
        }),
    }
}

/// Binds `name` to the special-form tag `builtin`, the Rust counterpart
/// of the original's `defineBuiltin(environment, builtin)`.
fn define_builtin(env: &Rc<RefCell<Environment>>, name: &'static str, builtin: crate::datum::Builtin) {
    Environment::define(env, Rc::from(name), Datum::UserDefined(crate::datum::UserDefined::Builtin(builtin)));
}

/// Defines every C9 native into `env` (spec.md §4.5's table plus the
/// SPEC_FULL.md-documented `not`/`<`/`>`/`<=`/`>=` supplements), plus the
/// special forms every evaluated program needs bound at the top level.
pub fn install(env: &Rc<RefCell<Environment>>) {
    use std::cmp::Ordering;
    use crate::datum::Builtin;

    define_builtin(env, "\u{3bb}", Builtin::Lambda);
    define_builtin(env, "define", Builtin::Define);
    define_builtin(env, "set!", Builtin::SetBang);
    define_builtin(env, "quote", Builtin::Quote);
    // `if` has no counterpart in the original's `Builtins::Builtin` enum
    // (`lspcore_builtins.h` only lists `LAMBDA, DEFINE, SET, QUOTE`); it is
    // spec.md's own sixth tag, bound under its only spelling.
    define_builtin(env, "if", Builtin::If);
    // alternative spelling, as the original's `defineBuiltins` also binds
    // "lambda" alongside the canonical "λ" spelling.
    define_builtin(env, "lambda", Builtin::Lambda);

    let natives: Vec<NativeProcedure> = vec![
        wrap("+", arithmetic::add),
        wrap("*", arithmetic::mul),
        wrap("-", arithmetic::sub),
        wrap("/", arithmetic::div),
        wrap("=", arithmetic::numeric_eq),
        wrap("<", |a| arithmetic::numeric_order(a, |o| o == Ordering::Less)),
        wrap(">", |a| arithmetic::numeric_order(a, |o| o == Ordering::Greater)),
        wrap("<=", |a| arithmetic::numeric_order(a, |o| o != Ordering::Greater)),
        wrap(">=", |a| arithmetic::numeric_order(a, |o| o != Ordering::Less)),
        wrap("not", arithmetic::not),
        wrap("pair?", pairs::pair_p),
        wrap("pair", pairs::pair),
        wrap("pair-first", pairs::pair_first),
        wrap("pair-second", pairs::pair_second),
        wrap("null?", pairs::null_p),
        wrap("list", pairs::list),
        wrap_infallible("equal?", equality::equal),
        wrap("set", sets::set),
        wrap("set-contains?", sets::set_contains),
        wrap("set-insert", sets::set_insert),
        wrap("set-remove", sets::set_remove),
        apply_native(),
        raise_native(),
    ];

    for native in natives {
        let name = Rc::clone(&native.name);
        Environment::define(env, name, Datum::UserDefined(crate::datum::UserDefined::NativeProcedure(native)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_defines_every_native_without_panicking() {
        let env = Environment::root();
        install(&env);
        assert!(Environment::lookup(&env, "+").is_some());
        assert!(Environment::lookup(&env, "apply").is_some());
        assert!(Environment::lookup(&env, "raise").is_some());
        assert!(Environment::lookup(&env, "set-remove").is_some());
    }

    #[test]
    fn install_binds_every_special_form_under_every_spelling() {
        let env = Environment::root();
        install(&env);
        for name in ["\u{3bb}", "lambda", "define", "set!", "quote", "if"] {
            assert!(Environment::lookup(&env, name).is_some(), "{name} should be bound");
        }
    }
}
