//! Benchmarks the trampoline's tail-call elimination (spec.md §4.8.3):
//! a self-tail-recursive loop should run in constant Rust stack depth
//! regardless of iteration count.
//!
//! Grounded on the teacher's `benches/arithmetic_non_foldable.rs`: build
//! the program once, assert its expected result, then benchmark repeated
//! runs with `black_box` around the result so the optimizer can't fold
//! the loop away.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use wisp::{Datum, Interpreter};

/// Counts down from `n` via a self-tail-call, returning `0`. Exercises
/// the environment-reuse path in `invoke_procedure`'s trampoline.
const COUNTDOWN: &str = "
(define countdown (lambda (n) (if (= n 0) 0 (countdown (- n 1)))))
(countdown 100000)
";

/// Sums `0..n` via a tail-recursive accumulator, returning `n*(n-1)/2`.
const SUM_ACCUMULATOR: &str = "
(define sum-loop (lambda (n acc) (if (= n 0) acc (sum-loop (- n 1) (+ acc n)))))
(sum-loop 10000 0)
";

fn run_source(code: &str, expected: i64) {
    let mut interp = Interpreter::new(1000, 64);
    let result = interp.run_source(code).expect("parses and evaluates");
    assert!(matches!(result, Datum::Integer(n) if i64::from(n) == expected));
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("countdown_100000_tail_calls", |b| {
        b.iter(|| {
            run_source(COUNTDOWN, 0);
            black_box(());
        });
    });

    c.bench_function("sum_accumulator_10000", |b| {
        b.iter(|| {
            run_source(SUM_ACCUMULATOR, 49_995_000);
            black_box(());
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
