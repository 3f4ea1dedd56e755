//! The tree-walking evaluator (spec.md §4.8, the C8 component — "the
//! hard part").
//!
//! Grounded on the teacher's `expressions.rs`/`run.rs` dispatch-by-variant
//! shape, but the trampoline in [`invoke_procedure`] has no teacher
//! equivalent: Python's call stack is the host's own, so the teacher never
//! needed tail-call elimination. This is spec.md §4.8.8's labeled loop,
//! written as a Rust `loop` rather than recursion so that a self- or
//! mutually-tail-recursive λ never grows the host stack.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::datum::{Builtin, Datum, PairNode, Procedure, UserDefined};
use crate::environment::Environment;
use crate::error::{EvalResult, RunError};
use crate::intern::Symbol;
use crate::resolve::resolve_body_form;
use crate::run::Interpreter;

/// Top-level entry point (spec.md §4.8.1): never throws. A signal raised
/// anywhere below is caught here and turned into the returned error datum.
pub fn evaluate(interp: &mut Interpreter, expr: &Datum) -> Datum {
    let globals = interp.globals();
    match evaluate_expr(interp, expr, &globals) {
        Ok(value) => value,
        Err(err) => err.into_datum(),
    }
}

/// `evaluate_expr(expr, env)` (spec.md §4.8.2): dispatches on datum
/// variant. Most variants are self-evaluating; `array`/`map_*` rebuild
/// themselves with evaluated elements; `pair`/`symbol` recurse.
pub fn evaluate_expr(interp: &mut Interpreter, expr: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    match expr {
        Datum::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(evaluate_expr(interp, item, env)?);
            }
            Ok(Datum::Array(Rc::new(out)))
        }
        Datum::MapString(map) => {
            let mut out = indexmap::IndexMap::with_capacity(map.len());
            for (k, v) in map.iter() {
                out.insert(Rc::clone(k), evaluate_expr(interp, v, env)?);
            }
            Ok(Datum::MapString(Rc::new(out)))
        }
        Datum::MapInt(map) => {
            let mut out = indexmap::IndexMap::with_capacity(map.len());
            for (k, v) in map.iter() {
                out.insert(*k, evaluate_expr(interp, v, env)?);
            }
            Ok(Datum::MapInt(Rc::new(out)))
        }
        Datum::UserDefined(UserDefined::Symbol(sym)) => evaluate_symbol(sym, env),
        Datum::UserDefined(UserDefined::Pair(pair)) => evaluate_pair(interp, pair, env),
        other => Ok(other.clone()),
    }
}

/// `evaluate_symbol(sym, env)` (spec.md §4.8.3).
pub fn evaluate_symbol(sym: &Symbol, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let cell = match sym {
        Symbol::OutOfPlace(_) | Symbol::InPlace(_) => {
            Environment::lookup(env, &sym.name()).ok_or_else(|| unbound(sym))?
        }
        Symbol::EntryPointer { entry, .. } => Rc::clone(entry),
        Symbol::ArgumentOffset { offset, .. } => {
            return Environment::argument(env, *offset)
                .ok_or_else(|| unbound(sym))
                .and_then(|value| check_undefined(value, sym));
        }
    };
    check_undefined(cell.borrow().clone(), sym)
}

fn unbound(sym: &Symbol) -> RunError {
    RunError::signal(-1, format!("unbound variable: {}", sym.name()))
}

fn check_undefined(value: Datum, sym: &Symbol) -> EvalResult<Datum> {
    if matches!(&value, Datum::UserDefined(UserDefined::Builtin(Builtin::Undefined))) {
        return Err(RunError::signal(-1, format!("variable referenced before it was defined: {}", sym.name())));
    }
    Ok(value)
}

/// `evaluate_pair(pair, env)` (spec.md §4.8.4).
pub fn evaluate_pair(interp: &mut Interpreter, pair: &PairNode, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let head = evaluate_expr(interp, &pair.first, env)?;
    match &head {
        Datum::UserDefined(UserDefined::Builtin(b)) => evaluate_builtin_form(interp, *b, &pair.second, env),
        Datum::UserDefined(UserDefined::Procedure(proc)) => {
            invoke_procedure(interp, Rc::clone(proc), pair.second.clone(), Rc::clone(env))
        }
        Datum::UserDefined(UserDefined::NativeProcedure(native)) => {
            invoke_native(interp, native.clone(), &pair.second, env)
        }
        Datum::Array(items) => {
            let Some(index_pair) = pair.second.as_pair() else {
                return Err(RunError::signal(-1, "array indexing takes exactly 1 argument"));
            };
            if !index_pair.second.is_nil() {
                return Err(RunError::signal(-1, "array indexing takes exactly 1 argument"));
            }
            let index_value = evaluate_expr(interp, &index_pair.first, env)?;
            let Datum::Integer(index) = index_value else {
                return Err(RunError::signal(-1, "array index must be an integer"));
            };
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| RunError::signal(-1, format!("array index {index} out of bounds")))
        }
        _ => Err(RunError::signal(-1, "cannot be invoked as a procedure")),
    }
}

fn evaluate_builtin_form(interp: &mut Interpreter, b: Builtin, tail: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    match b {
        Builtin::Lambda => evaluate_lambda(tail, env),
        Builtin::Define => evaluate_define(interp, tail, env),
        Builtin::SetBang => evaluate_set_bang(interp, tail, env),
        Builtin::Quote => {
            let items = tail.proper_list_to_vec().map_err(|_| RunError::signal(-1, "quote takes a single form"))?;
            let [value] = &items[..] else { return Err(RunError::signal(-1, "quote takes a single form")) };
            Ok(value.clone())
        }
        Builtin::If => {
            let result_form = partially_evaluate_if(interp, tail, env)?;
            evaluate_expr(interp, &result_form, env)
        }
        Builtin::Undefined => Err(RunError::signal(-1, "cannot be invoked as a procedure")),
    }
}

/// `evaluate_lambda(tail, env)` (spec.md §4.8.5).
pub fn evaluate_lambda(tail: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let Some(spec_pair) = tail.as_pair() else {
        return Err(RunError::signal(-1, "lambda requires a parameter spec and at least one body form"));
    };
    let (positional, rest) = parse_parameter_spec(&spec_pair.first)?;
    let body_forms = spec_pair
        .second
        .proper_list_to_vec()
        .map_err(|_| RunError::signal(-1, "lambda body must be a proper list"))?;
    if body_forms.is_empty() {
        return Err(RunError::signal(-1, "lambda body must have at least one form"));
    }
    let mut seen: Vec<&Rc<str>> = Vec::new();
    for name in positional.iter().chain(rest.iter()) {
        if seen.contains(&name) {
            return Err(RunError::signal(-1, format!("duplicate parameter name: {name}")));
        }
        seen.push(name);
    }
    let resolved_body: Vec<Datum> =
        body_forms.iter().map(|form| resolve_body_form(form, &positional, rest.as_ref(), env)).collect();
    Environment::mark_as_referenced(env);
    Ok(Datum::UserDefined(UserDefined::Procedure(Rc::new(Procedure {
        positional_parameters: positional,
        rest_parameter: rest,
        body: resolved_body,
        captured_environment: Rc::clone(env),
    }))))
}

fn parse_parameter_spec(spec: &Datum) -> EvalResult<(Vec<Rc<str>>, Option<Rc<str>>)> {
    match spec {
        Datum::Nil => Ok((Vec::new(), None)),
        Datum::UserDefined(UserDefined::Symbol(sym)) => Ok((Vec::new(), Some(Rc::from(sym.name().as_ref())))),
        Datum::UserDefined(UserDefined::Pair(_)) => {
            let mut positional = Vec::new();
            let mut cursor = spec;
            loop {
                match cursor {
                    Datum::Nil => return Ok((positional, None)),
                    Datum::UserDefined(UserDefined::Pair(p)) => {
                        let Datum::UserDefined(UserDefined::Symbol(sym)) = &p.first else {
                            return Err(RunError::signal(-1, "parameter list must contain only symbols"));
                        };
                        positional.push(Rc::from(sym.name().as_ref()));
                        cursor = &p.second;
                    }
                    Datum::UserDefined(UserDefined::Symbol(sym)) => {
                        return Ok((positional, Some(Rc::from(sym.name().as_ref()))));
                    }
                    _ => return Err(RunError::signal(-1, "improper parameter list must end in a symbol")),
                }
            }
        }
        _ => Err(RunError::signal(-1, "invalid parameter specification")),
    }
}

/// `partially_evaluate_if(tail, env)` (spec.md §4.8.7): evaluates the
/// predicate eagerly but returns the winning branch unevaluated, so tail
/// callers can loop instead of recursing.
pub fn partially_evaluate_if(interp: &mut Interpreter, tail: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let items = tail.proper_list_to_vec().map_err(|_| RunError::signal(-1, "if requires exactly 3 forms"))?;
    let [pred, then_form, else_form] = &items[..] else {
        return Err(RunError::signal(-1, format!("if takes 3 arguments, was invoked with {}", items.len())));
    };
    let predicate = evaluate_expr(interp, pred, env)?;
    Ok(if predicate.is_false() { else_form.clone() } else { then_form.clone() })
}

/// `evaluate_define(tail, env)` (spec.md §4.8.9): binds `name` to
/// `UNDEFINED` before evaluating `value`, so a recursive λ referring to
/// its own name resolves to a stable entry ahead of time, then overwrites
/// it with the real value.
pub fn evaluate_define(interp: &mut Interpreter, tail: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let items = tail.proper_list_to_vec().map_err(|_| RunError::signal(-1, "define requires a name and a value form"))?;
    let [name_form, value_form] = &items[..] else {
        return Err(RunError::signal(-1, format!("define takes 2 arguments, was invoked with {}", items.len())));
    };
    let Datum::UserDefined(UserDefined::Symbol(sym)) = name_form else {
        return Err(RunError::signal(-1, "define's first argument must be a symbol"));
    };
    let name: Rc<str> = Rc::from(sym.name().as_ref());
    let (cell, _) = Environment::define(env, Rc::clone(&name), Datum::UserDefined(UserDefined::Builtin(Builtin::Undefined)));
    let value = evaluate_expr(interp, value_form, env)?;
    *cell.borrow_mut() = value.clone();
    Ok(value)
}

fn evaluate_set_bang(interp: &mut Interpreter, tail: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
    let items = tail.proper_list_to_vec().map_err(|_| RunError::signal(-1, "set! requires a name and a value form"))?;
    let [name_form, value_form] = &items[..] else {
        return Err(RunError::signal(-1, format!("set! takes 2 arguments, was invoked with {}", items.len())));
    };
    let Datum::UserDefined(UserDefined::Symbol(sym)) = name_form else {
        return Err(RunError::signal(-1, "set!'s first argument must be a symbol"));
    };
    let cell = Environment::lookup(env, &sym.name()).ok_or_else(|| unbound(sym))?;
    let value = evaluate_expr(interp, value_form, env)?;
    *cell.borrow_mut() = value.clone();
    Ok(value)
}

fn invoke_native(
    interp: &mut Interpreter,
    native: crate::datum::NativeProcedure,
    tail: &Datum,
    env: &Rc<RefCell<Environment>>,
) -> EvalResult<Datum> {
    let args = tail.proper_list_to_vec().map_err(|_| RunError::signal(-1, "argument list must be proper"))?;
    let mut args_and_output = args;
    for slot in &mut args_and_output {
        *slot = evaluate_expr(interp, slot, env)?;
    }
    let mut env_ref = Rc::clone(env);
    (native.func)(&mut args_and_output, &mut env_ref, interp.type_offset(), interp)?;
    args_and_output.into_iter().next().ok_or_else(|| RunError::internal("native procedure produced no result"))
}

/// Classification used by [`invoke_procedure`]'s tail-position loop
/// (spec.md §4.8.8's "classify"): evaluates the form's head once to see
/// whether it resolves to `if`, a user procedure, or anything else.
enum Classification {
    Other,
    If,
    Call(Rc<Procedure>),
}

fn classify(interp: &mut Interpreter, form: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Classification> {
    let Some(pair) = form.as_pair() else { return Ok(Classification::Other) };
    match evaluate_expr(interp, &pair.first, env) {
        Ok(Datum::UserDefined(UserDefined::Builtin(Builtin::If))) => Ok(Classification::If),
        Ok(Datum::UserDefined(UserDefined::Procedure(proc))) => Ok(Classification::Call(proc)),
        _ => Ok(Classification::Other),
    }
}

/// `invoke_procedure(proc, tail, caller_env)` (spec.md §4.8.8) — the
/// trampoline. A labeled `loop` stands in for the pseudocode's `goto
/// 'tail_call`; the host stack never grows across a tail call.
///
/// **Environment reuse invariant**: `fn_env` is only reused across a tail
/// call into a (possibly different) procedure when it was never captured
/// by a closure (`!Environment::is_referenced(&fn_env)`). The spec's own
/// pseudocode reparents the replacement environment on the outer
/// `caller_env` variable; we reparent on the *newly resolved* procedure's
/// own `captured_environment` instead; see DESIGN.md's open-question
/// entry — reusing the literal pseudocode's binding would attach a
/// callee's activation record to the wrong lexical scope whenever the
/// tail call crosses into a procedure defined somewhere other than the
/// original call site.
pub fn invoke_procedure(
    interp: &mut Interpreter,
    mut proc: Rc<Procedure>,
    mut rest: Datum,
    caller_env: Rc<RefCell<Environment>>,
) -> EvalResult<Datum> {
    let mut args_env = caller_env;
    let mut fn_env = Environment::child_with_arguments(Rc::clone(&proc.captured_environment), Vec::new());

    'tail_call: loop {
        let mut arg_values: SmallVec<[Datum; 4]> = SmallVec::with_capacity(proc.positional_parameters.len() + 1);
        for _ in &proc.positional_parameters {
            match rest.as_pair() {
                Some(p) => {
                    arg_values.push(evaluate_expr(interp, &p.first, &args_env)?);
                    rest = p.second.clone();
                }
                None if rest.is_nil() => return Err(RunError::signal(-1, "not enough arguments")),
                None => return Err(RunError::signal(-1, "argument list is improper")),
            }
        }
        if proc.rest_parameter.is_some() {
            let mut collected = Vec::new();
            while let Some(p) = rest.as_pair() {
                collected.push(evaluate_expr(interp, &p.first, &args_env)?);
                rest = p.second.clone();
            }
            if !rest.is_nil() {
                return Err(RunError::signal(-1, "argument list is improper"));
            }
            arg_values.push(Datum::list(collected));
        } else if !rest.is_nil() {
            return Err(RunError::signal(
                -1,
                format!("takes {} arguments, was invoked with more", proc.positional_parameters.len()),
            ));
        }

        Environment::clear_locals(&fn_env, Rc::clone(&proc.captured_environment), Vec::new());
        let names = proc.positional_parameters.iter().chain(proc.rest_parameter.iter());
        let arguments: Vec<_> = names
            .zip(arg_values)
            .map(|(name, value)| Environment::define_or_redefine(&fn_env, Rc::clone(name), value))
            .collect();
        Environment::set_arguments(&fn_env, arguments);

        let (effect_forms, last_form) =
            proc.body.split_at(proc.body.len() - 1);
        for form in effect_forms {
            evaluate_expr(interp, form, &fn_env)?;
        }
        let mut form = last_form[0].clone();

        loop {
            match classify(interp, &form, &fn_env)? {
                Classification::Other => return evaluate_expr(interp, &form, &fn_env),
                Classification::If => {
                    let tail = form.as_pair().expect("classify(If) implies a pair").second.clone();
                    form = partially_evaluate_if(interp, &tail, &fn_env)?;
                }
                Classification::Call(next_proc) => {
                    let call_tail = form.as_pair().expect("classify(Call) implies a pair").second.clone();
                    args_env = Rc::clone(&fn_env);
                    if Environment::is_referenced(&fn_env) {
                        fn_env = Environment::child_with_arguments(Rc::clone(&next_proc.captured_environment), Vec::new());
                    }
                    proc = next_proc;
                    rest = call_tail;
                    continue 'tail_call;
                }
            }
        }
    }
}

/// Invokes `proc` with already-evaluated `arg_values`, used by the
/// `apply` native (spec.md §4.5) where the argument list was built from a
/// proper list rather than parsed from source. Wrapping each value in a
/// synthetic `(quote value)` form lets this reuse [`invoke_procedure`]'s
/// trampoline (including tail-call elimination in the callee's body)
/// without duplicating its argument-binding logic.
pub fn invoke_procedure_with_values(
    interp: &mut Interpreter,
    proc: Rc<Procedure>,
    arg_values: Vec<Datum>,
    caller_env: Rc<RefCell<Environment>>,
) -> EvalResult<Datum> {
    let synthetic_tail = Datum::list(
        arg_values.into_iter().map(|value| Datum::list(vec![Datum::builtin(Builtin::Quote), value])),
    );
    invoke_procedure(interp, proc, synthetic_tail, caller_env)
}

/// Invokes a native procedure with already-evaluated `arg_values`, the
/// `apply`-facing counterpart of [`invoke_native`].
pub fn invoke_native_with_values(
    interp: &mut Interpreter,
    native: crate::datum::NativeProcedure,
    mut arg_values: Vec<Datum>,
    env: &Rc<RefCell<Environment>>,
) -> EvalResult<Datum> {
    let mut env_ref = Rc::clone(env);
    (native.func)(&mut arg_values, &mut env_ref, interp.type_offset(), interp)?;
    arg_values.into_iter().next().ok_or_else(|| RunError::internal("native procedure produced no result"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Interpreter;

    fn eval_str(interp: &mut Interpreter, src: &str) -> Datum {
        let datum = crate::parser::parse_one(src, interp.interner_mut()).expect("parses");
        evaluate(interp, &datum)
    }

    #[test]
    fn self_evaluating_atoms_return_themselves() {
        let mut interp = Interpreter::new(1000, 64);
        assert!(matches!(eval_str(&mut interp, "42"), Datum::Integer(42)));
    }

    #[test]
    fn if_picks_the_right_branch() {
        let mut interp = Interpreter::new(1000, 64);
        assert!(matches!(eval_str(&mut interp, "(if #t 1 2)"), Datum::Integer(1)));
        assert!(matches!(eval_str(&mut interp, "(if #f 1 2)"), Datum::Integer(2)));
    }

    #[test]
    fn lambda_application_and_closures() {
        let mut interp = Interpreter::new(1000, 64);
        let result = eval_str(&mut interp, "((lambda (x y) (+ x y)) 3 4)");
        assert!(matches!(result, Datum::Integer(7)));
    }

    #[test]
    fn define_allows_self_recursion() {
        let mut interp = Interpreter::new(1000, 64);
        eval_str(&mut interp, "(define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))");
        let result = eval_str(&mut interp, "(fact 5)");
        assert!(matches!(result, Datum::Integer(120)));
    }

    #[test]
    fn deep_tail_recursion_does_not_overflow() {
        let mut interp = Interpreter::new(1000, 64);
        eval_str(&mut interp, "(define count (lambda (n acc) (if (= n 0) acc (count (- n 1) (+ acc 1)))))");
        let result = eval_str(&mut interp, "(count 200000 0)");
        assert!(matches!(result, Datum::Integer(200_000)));
    }

    #[test]
    fn unbound_variable_becomes_an_error_datum() {
        let mut interp = Interpreter::new(1000, 64);
        let result = eval_str(&mut interp, "nonexistent");
        assert!(matches!(result, Datum::Error(_)));
    }
}
