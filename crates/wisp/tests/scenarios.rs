//! Integration tests for the concrete scenarios and universal invariants.
//!
//! Grounded in the teacher's top-level `tests/` convention (e.g.
//! `ouros/tests/repl_tests.rs`): black-box, going through the public
//! `wisp::Interpreter` surface rather than reaching into internals.

use wisp::{Datum, Interpreter, parse_one, print};

fn eval(src: &str) -> Datum {
    let mut interp = Interpreter::new(1000, 64);
    interp.run_source(src).expect("parses and evaluates")
}

fn eval_int(src: &str) -> i32 {
    match eval(src) {
        Datum::Integer(n) => n,
        other => panic!("expected integer, got {other:?}"),
    }
}

#[test]
fn s1_variadic_addition() {
    assert_eq!(eval_int("(+ 1 2 3)"), 6);
}

#[test]
fn s2_lambda_creation_and_application() {
    assert_eq!(eval_int("((\u{3bb} (x y) (+ x y)) 10 20)"), 30);
}

#[test]
fn s3_tail_call_iteration_does_not_overflow_the_stack() {
    let result = eval(
        "
        (define loop (\u{3bb} (n) (if (= n 0) 'done (loop (- n 1)))))
        (loop 100000)
        ",
    );
    match result {
        Datum::UserDefined(wisp::UserDefined::Symbol(sym)) => assert_eq!(sym.name().as_ref(), "done"),
        other => panic!("expected symbol `done`, got {other:?}"),
    }
}

#[test]
fn s4_closure_survives_interleaved_tail_calls() {
    let result = eval(
        "
        (define make-counter
          (\u{3bb} ()
            (define n 0)
            (\u{3bb} () (set! n (+ n 1)) n)))
        (define c (make-counter))
        (c) (c) (c)
        ",
    );
    assert!(matches!(result, Datum::Integer(3)));
}

#[test]
fn s5_persistent_set_is_immutable_under_remove() {
    let mut interp = Interpreter::new(1000, 64);
    interp.run_source("(define s (set 3 1 4 1 5 9 2 6))").expect("defines");
    assert!(matches!(interp.run_source("(set-contains? s 5)").expect("evals"), Datum::Boolean(true)));
    assert!(matches!(interp.run_source("(set-contains? (set-remove s 5) 5)").expect("evals"), Datum::Boolean(false)));
    assert!(matches!(interp.run_source("(set-contains? s 5)").expect("evals"), Datum::Boolean(true)));
}

#[test]
fn s6_quote_equality_is_structural_not_cross_kind_inside_pairs() {
    assert!(matches!(eval("(equal? '(1 2 3) (list 1 2 3))"), Datum::Boolean(true)));
    assert!(matches!(eval("(equal? '(1 2.0B 3) (list 1 2 3))"), Datum::Boolean(false)));
}

#[test]
fn invariant_self_evaluation_of_atoms() {
    for src in ["42", "3.14", "#t", "#f", "\"hello\"", "()"] {
        let mut interp = Interpreter::new(1000, 64);
        let datum = parse_one(src, interp.interner_mut()).expect("parses");
        let evaluated = interp.evaluate(&datum);
        assert_eq!(print(&evaluated), print(&datum), "atom {src} should self-evaluate");
    }
}

#[test]
fn invariant_define_then_lookup_sees_the_new_value() {
    assert_eq!(eval_int("(define x 7) x"), 7);
}

#[test]
fn invariant_set_membership_roundtrips_through_insert_and_remove() {
    assert!(matches!(eval("(set-contains? (set-insert (set) 5) 5)"), Datum::Boolean(true)));
    assert!(matches!(eval("(set-contains? (set-remove (set-insert (set) 5) 5) 5)"), Datum::Boolean(false)));
}

#[test]
fn invariant_arithmetic_equivalence_under_promotion() {
    assert!(matches!(eval("(= (+ 1 2.0B) 3.0B)"), Datum::Boolean(true)));
}

#[test]
fn print_parse_roundtrip_for_closed_atom_and_container_subset() {
    for src in ["42", "42L", "3.14", "\"a\\nb\"", "(1 2 3)", "(1 . 2)", "[1 2 3]", "#error[7 \"bad\"]"] {
        let mut interner = wisp::Interner::new();
        let datum = parse_one(src, &mut interner).expect("parses");
        let printed = print(&datum);
        let reparsed = parse_one(&printed, &mut interner).expect("re-parses its own printed form");
        assert_eq!(print(&reparsed), printed, "round-trip mismatch for {src}");
    }
}

#[test]
fn unbound_variable_surfaces_as_an_error_datum_not_a_panic() {
    let result = eval("nonexistent-name");
    match result {
        Datum::Error(e) => assert!(e.message.contains("unbound variable")),
        other => panic!("expected an error datum, got {other:?}"),
    }
}

#[test]
fn raise_propagates_an_arbitrary_datum_through_top_level_evaluate() {
    let result = eval("(raise 'boom)");
    match result {
        Datum::UserDefined(wisp::UserDefined::Symbol(sym)) => assert_eq!(sym.name().as_ref(), "boom"),
        other => panic!("expected raised symbol to reach the top, got {other:?}"),
    }
}
