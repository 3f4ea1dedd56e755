//! Arithmetic classification and the four numeric operators (spec.md §4.4).
//!
//! Grounded on the teacher's `modules/numbers_mod.rs`, which classifies a
//! heterogeneous argument vector before dispatching to a single numeric
//! kind; the four-kind promotion table here is this language's equivalent
//! of that module's int/float coercion rules.

use crate::datum::Datum;
use crate::error::{EvalResult, RunError};
use crate::external::{Decimal64, decimal_double_eq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Integer64,
    Double,
    Decimal64,
}

fn kind_of(d: &Datum) -> Option<Kind> {
    match d {
        Datum::Integer(_) => Some(Kind::Integer),
        Datum::Integer64(_) => Some(Kind::Integer64),
        Datum::Double(_) => Some(Kind::Double),
        Datum::Decimal64(_) => Some(Kind::Decimal64),
        _ => None,
    }
}

/// Classifies `args` per spec.md §4.4: every element must be numeric, and
/// `integer` promotes freely into any other numeric kind, but
/// `{integer64,double}`, `{integer64,decimal64}`, and `{double,decimal64}`
/// never mix.
fn classify(args: &[Datum]) -> EvalResult<Kind> {
    let mut settled: Option<Kind> = None;
    for arg in args {
        let Some(kind) = kind_of(arg) else {
            return Err(RunError::signal(-1, "non-numeric argument in arithmetic"));
        };
        settled = Some(match (settled, kind) {
            (None, k) => k,
            (Some(Kind::Integer), k) | (Some(k), Kind::Integer) => k,
            (Some(a), b) if a == b => a,
            (Some(a), b) => {
                return Err(RunError::signal(-1, format!("incompatible numeric types: {a:?} and {b:?}")));
            }
        });
    }
    settled.ok_or_else(|| RunError::signal(-1, "arithmetic requires at least one operand"))
}

enum Promoted {
    Integer(Vec<i32>),
    Integer64(Vec<i64>),
    Double(Vec<f64>),
    Decimal64(Vec<Decimal64>),
}

fn promote(args: &[Datum], kind: Kind) -> Promoted {
    match kind {
        Kind::Integer => {
            Promoted::Integer(args.iter().map(|d| match d { Datum::Integer(n) => *n, _ => unreachable!() }).collect())
        }
        Kind::Integer64 => Promoted::Integer64(
            args.iter()
                .map(|d| match d {
                    Datum::Integer(n) => i64::from(*n),
                    Datum::Integer64(n) => *n,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        Kind::Double => Promoted::Double(
            args.iter()
                .map(|d| match d {
                    Datum::Integer(n) => f64::from(*n),
                    Datum::Double(n) => *n,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        Kind::Decimal64 => Promoted::Decimal64(
            args.iter()
                .map(|d| match d {
                    Datum::Integer(n) => Decimal64::new((*n).into()),
                    Datum::Decimal64(n) => *n,
                    _ => unreachable!(),
                })
                .collect(),
        ),
    }
}

fn fold_identity(kind: Kind, add: bool) -> Datum {
    match (kind, add) {
        (Kind::Integer, true) => Datum::Integer(0),
        (Kind::Integer, false) => Datum::Integer(1),
        (Kind::Integer64, true) => Datum::Integer64(0),
        (Kind::Integer64, false) => Datum::Integer64(1),
        (Kind::Double, true) => Datum::Double(0.0),
        (Kind::Double, false) => Datum::Double(1.0),
        (Kind::Decimal64, true) => Datum::Decimal64(Decimal64::new(0.into())),
        (Kind::Decimal64, false) => Datum::Decimal64(Decimal64::new(1.into())),
    }
}

macro_rules! fold_promoted {
    ($promoted:expr, $identity:expr, $op:expr) => {
        match $promoted {
            Promoted::Integer(xs) => Datum::Integer(xs.into_iter().fold($identity as i32, $op)),
            Promoted::Integer64(xs) => Datum::Integer64(xs.into_iter().fold($identity as i64, $op)),
            Promoted::Double(xs) => Datum::Double(xs.into_iter().fold($identity as f64, $op)),
            Promoted::Decimal64(xs) => {
                let init = if $identity == 0 { Decimal64::new(0.into()) } else { Decimal64::new(1.into()) };
                Datum::Decimal64(xs.into_iter().fold(init, $op))
            }
        }
    };
}

pub fn add(args: &[Datum]) -> EvalResult<Datum> {
    if args.is_empty() {
        return Ok(Datum::Integer(0));
    }
    let kind = classify(args)?;
    let promoted = promote(args, kind);
    Ok(fold_promoted!(promoted, 0, |acc, x| acc + x))
}

pub fn mul(args: &[Datum]) -> EvalResult<Datum> {
    if args.is_empty() {
        return Ok(Datum::Integer(1));
    }
    let kind = classify(args)?;
    let promoted = promote(args, kind);
    Ok(fold_promoted!(promoted, 1, |acc, x| acc * x))
}

pub fn sub(args: &[Datum]) -> EvalResult<Datum> {
    if args.is_empty() {
        return Err(RunError::signal(-1, "- requires at least one operand"));
    }
    let kind = classify(args)?;
    if args.len() == 1 {
        return Ok(match promote(args, kind) {
            Promoted::Integer(xs) => Datum::Integer(-xs[0]),
            Promoted::Integer64(xs) => Datum::Integer64(-xs[0]),
            Promoted::Double(xs) => Datum::Double(-xs[0]),
            Promoted::Decimal64(xs) => Datum::Decimal64(xs[0].neg()),
        });
    }
    Ok(match promote(args, kind) {
        Promoted::Integer(xs) => Datum::Integer(xs[1..].iter().fold(xs[0], |acc, x| acc - x)),
        Promoted::Integer64(xs) => Datum::Integer64(xs[1..].iter().fold(xs[0], |acc, x| acc - x)),
        Promoted::Double(xs) => Datum::Double(xs[1..].iter().fold(xs[0], |acc, x| acc - x)),
        Promoted::Decimal64(xs) => Datum::Decimal64(xs[1..].iter().fold(xs[0], |acc, x| acc.sub(*x))),
    })
}

/// Unary `/` is identity, not reciprocal (spec.md §4.4's documented
/// resolution of the reference source's inconsistency on this point).
pub fn div(args: &[Datum]) -> EvalResult<Datum> {
    if args.is_empty() {
        return Err(RunError::signal(-1, "/ requires at least one operand"));
    }
    let kind = classify(args)?;
    if args.len() == 1 {
        return Ok(args[0].clone());
    }
    Ok(match promote(args, kind) {
        Promoted::Integer(xs) => Datum::Integer(xs[1..].iter().fold(xs[0], |acc, x| acc / x)),
        Promoted::Integer64(xs) => Datum::Integer64(xs[1..].iter().fold(xs[0], |acc, x| acc / x)),
        Promoted::Double(xs) => Datum::Double(xs[1..].iter().fold(xs[0], |acc, x| acc / x)),
        Promoted::Decimal64(xs) => Datum::Decimal64(xs[1..].iter().fold(xs[0], |acc, x| acc.div(*x))),
    })
}

/// `=`: n-ary, true iff every adjacent pair compares equal (spec.md §4.4).
pub fn numeric_eq(args: &[Datum]) -> EvalResult<Datum> {
    if args.len() < 2 {
        return Ok(Datum::Boolean(true));
    }
    for pair in args.windows(2) {
        if !numeric_pair_eq(&pair[0], &pair[1])? {
            return Ok(Datum::Boolean(false));
        }
    }
    Ok(Datum::Boolean(true))
}

fn numeric_pair_eq(a: &Datum, b: &Datum) -> EvalResult<bool> {
    match (a, b) {
        (Datum::Double(x), Datum::Decimal64(y)) | (Datum::Decimal64(y), Datum::Double(x)) => {
            Ok(decimal_double_eq(*y, *x))
        }
        _ => {
            let joint = classify(&[a.clone(), b.clone()])?;
            Ok(match promote(&[a.clone(), b.clone()], joint) {
                Promoted::Integer(xs) => xs[0] == xs[1],
                Promoted::Integer64(xs) => xs[0] == xs[1],
                Promoted::Double(xs) => xs[0] == xs[1],
                Promoted::Decimal64(xs) => xs[0] == xs[1],
            })
        }
    }
}

/// Supplemental comparison operators (`<`, `>`, `<=`, `>=`), reusing the
/// same classification/promotion machinery as `=`.
pub fn numeric_order(args: &[Datum], op: fn(std::cmp::Ordering) -> bool) -> EvalResult<Datum> {
    if args.len() < 2 {
        return Ok(Datum::Boolean(true));
    }
    for pair in args.windows(2) {
        let ordering = numeric_pair_cmp(&pair[0], &pair[1])?;
        if !op(ordering) {
            return Ok(Datum::Boolean(false));
        }
    }
    Ok(Datum::Boolean(true))
}

fn numeric_pair_cmp(a: &Datum, b: &Datum) -> EvalResult<std::cmp::Ordering> {
    let joint = classify(&[a.clone(), b.clone()])?;
    Ok(match promote(&[a.clone(), b.clone()], joint) {
        Promoted::Integer(xs) => xs[0].cmp(&xs[1]),
        Promoted::Integer64(xs) => xs[0].cmp(&xs[1]),
        Promoted::Double(xs) => xs[0].partial_cmp(&xs[1]).unwrap_or(std::cmp::Ordering::Equal),
        Promoted::Decimal64(xs) => xs[0].to_f64().partial_cmp(&xs[1].to_f64()).unwrap_or(std::cmp::Ordering::Equal),
    })
}

/// `not`: the one-argument boolean negation supplement documented
/// alongside the arithmetic comparisons.
pub fn not(args: &[Datum]) -> EvalResult<Datum> {
    let [arg] = args else {
        return Err(RunError::signal(-1, format!("not takes 1 argument, was invoked with {}", args.len())));
    };
    Ok(Datum::Boolean(arg.is_false()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_folds_with_identity_zero() {
        assert!(matches!(add(&[]).unwrap(), Datum::Integer(0)));
        let sum = add(&[Datum::Integer(1), Datum::Integer(2), Datum::Integer(3)]).unwrap();
        assert!(matches!(sum, Datum::Integer(6)));
    }

    #[test]
    fn integer_promotes_into_double() {
        let sum = add(&[Datum::Integer(1), Datum::Double(2.5)]).unwrap();
        assert!(matches!(sum, Datum::Double(d) if d == 3.5));
    }

    #[test]
    fn integer64_and_double_do_not_mix() {
        let err = add(&[Datum::Integer64(1), Datum::Double(2.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn unary_div_is_identity() {
        let result = div(&[Datum::Integer(5)]).unwrap();
        assert!(matches!(result, Datum::Integer(5)));
    }

    #[test]
    fn numeric_eq_cross_kind_decimal_and_double() {
        let dec = Datum::Decimal64(Decimal64::parse("2.0").unwrap());
        let dbl = Datum::Double(2.0);
        let result = numeric_eq(&[dec, dbl]).unwrap();
        assert!(matches!(result, Datum::Boolean(true)));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let result = sub(&[Datum::Integer(10), Datum::Integer(3), Datum::Integer(2)]).unwrap();
        assert!(matches!(result, Datum::Integer(5)));
    }
}
