//! Public interface for running programs (spec.md §6.3, the evaluator
//! boundary).
//!
//! Grounded on the teacher's `run.rs::Runner`, a single entry-point struct
//! wrapping parse+prepare+execute — at a fraction of its complexity, since
//! this language has neither bytecode compilation nor async snapshot/resume
//! (the teacher's `Runner` exists mainly to support those).

use std::cell::RefCell;
use std::rc::Rc;

use crate::datum::{Datum, NativeProcedure, UserDefined};
use crate::environment::Environment;
use crate::error::{EvalResult, RunError, SyntaxError};
use crate::evaluator;
use crate::heap::Heap;
use crate::intern::Interner;
use crate::parser;

/// Whether [`Interpreter::define_native`] installed a fresh binding or
/// found the name already taken, matching spec.md §6.3's `ok |
/// already_defined` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
    Ok,
    AlreadyDefined,
}

/// Owns the global environment, the symbol interner, and the opaque-UDT
/// heap for one run of the language. This is spec.md §6.3's
/// `new_interpreter(type_offset, allocator) → Interpreter`.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    interner: Interner,
    heap: Heap,
    type_offset: i32,
}

impl Interpreter {
    /// `new_interpreter(type_offset, allocator)`: `allocator` is the
    /// opaque-UDT heap's initial capacity hint.
    #[must_use]
    pub fn new(type_offset: i32, allocator_capacity: usize) -> Self {
        let globals = Environment::root();
        crate::builtins::install(&globals);
        Self { globals, interner: Interner::new(), heap: Heap::with_capacity(allocator_capacity), type_offset }
    }

    #[must_use]
    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.globals)
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    #[must_use]
    pub fn type_offset(&self) -> i32 {
        self.type_offset
    }

    /// `interp.define_native(name, callable)`: installs a native procedure
    /// into the global environment, refusing to shadow an existing
    /// top-level binding.
    pub fn define_native(&mut self, name: &str, native: NativeProcedure) -> DefineOutcome {
        let (_, inserted) = Environment::define(
            &self.globals,
            Rc::from(name),
            Datum::UserDefined(UserDefined::NativeProcedure(native)),
        );
        if inserted { DefineOutcome::Ok } else { DefineOutcome::AlreadyDefined }
    }

    /// `interp.evaluate(datum) → datum`: never throws, per spec.md §4.8.1.
    #[must_use]
    pub fn evaluate(&mut self, datum: &Datum) -> Datum {
        evaluator::evaluate(self, datum)
    }

    /// `interp.evaluate_expression(datum, env) → datum`: may propagate a
    /// signal to a native caller that invokes it directly.
    pub fn evaluate_expression(&mut self, datum: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult<Datum> {
        evaluator::evaluate_expr(self, datum, env)
    }

    /// Applies an already-evaluated `callee` to already-evaluated `args`,
    /// the shared path behind the `apply` native and any host embedder
    /// calling back into a procedure value directly.
    pub fn apply_value(
        &mut self,
        callee: &Datum,
        args: &[Datum],
        env: &Rc<RefCell<Environment>>,
        _type_offset: i32,
    ) -> EvalResult<Datum> {
        match callee {
            Datum::UserDefined(UserDefined::Procedure(proc)) => {
                evaluator::invoke_procedure_with_values(self, Rc::clone(proc), args.to_vec(), Rc::clone(env))
            }
            Datum::UserDefined(UserDefined::NativeProcedure(native)) => {
                evaluator::invoke_native_with_values(self, native.clone(), args.to_vec(), env)
            }
            _ => Err(RunError::signal(-1, "cannot be invoked as a procedure")),
        }
    }

    /// Parses and evaluates every top-level form in `src` in order,
    /// returning the last form's result (or `nil` for an empty program).
    /// A parse failure aborts the whole run, per spec.md §7's recovery
    /// policy ("parser errors abort the current parse").
    ///
    /// # Errors
    /// Returns the [`SyntaxError`] from the first malformed form.
    pub fn run_source(&mut self, src: &str) -> Result<Datum, SyntaxError> {
        let forms = {
            let Self { interner, heap, type_offset, .. } = self;
            parser::parse_all_with_heap(src, interner, heap, *type_offset)?
        };
        let mut result = Datum::Nil;
        for form in &forms {
            result = self.evaluate(form);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_source_evaluates_every_top_level_form() {
        let mut interp = Interpreter::new(1000, 64);
        let result = interp.run_source("(define x 10) (+ x 5)").expect("parses");
        assert!(matches!(result, Datum::Integer(15)));
    }

    #[test]
    fn define_native_refuses_to_shadow_an_existing_binding() {
        let mut interp = Interpreter::new(1000, 64);
        let native = NativeProcedure { name: Rc::from("my-native"), func: Rc::new(|_, _, _, _| Ok(())) };
        assert_eq!(interp.define_native("my-native", native.clone()), DefineOutcome::Ok);
        assert_eq!(interp.define_native("my-native", native), DefineOutcome::AlreadyDefined);
    }

    #[test]
    fn apply_value_invokes_a_procedure() {
        let mut interp = Interpreter::new(1000, 64);
        let proc = interp.run_source("(lambda (x) (* x 2))").expect("parses");
        let env = interp.globals();
        let type_offset = interp.type_offset();
        let result = interp.apply_value(&proc, &[Datum::Integer(21)], &env, type_offset).expect("applies");
        assert!(matches!(result, Datum::Integer(42)));
    }
}
