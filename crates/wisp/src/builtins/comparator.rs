//! The standard comparator (spec.md §3.4, §4.5): used by [`PersistentSet`]
//! and the `set` family of builtins to order datums.
//!
//! [`PersistentSet`]: crate::persistent_set::PersistentSet

use std::cmp::Ordering;

use crate::datum::{Datum, UserDefined, variant_rank_for_ordering};

fn is_numeric(d: &Datum) -> bool {
    matches!(d, Datum::Integer(_) | Datum::Integer64(_) | Datum::Double(_) | Datum::Decimal64(_))
}

fn numeric_cmp(a: &Datum, b: &Datum) -> Ordering {
    match (a, b) {
        (Datum::Integer(x), Datum::Integer(y)) => x.cmp(y),
        (Datum::Integer64(x), Datum::Integer64(y)) => x.cmp(y),
        (Datum::Double(x), Datum::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Datum::Decimal64(x), Datum::Decimal64(y)) => x.to_f64().partial_cmp(&y.to_f64()).unwrap_or(Ordering::Equal),
        (Datum::Integer(x), Datum::Integer64(y)) => i64::from(*x).cmp(y),
        (Datum::Integer64(x), Datum::Integer(y)) => x.cmp(&i64::from(*y)),
        (Datum::Integer(x), Datum::Double(y)) => f64::from(*x).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Datum::Double(x), Datum::Integer(y)) => x.partial_cmp(&f64::from(*y)).unwrap_or(Ordering::Equal),
        (Datum::Integer(x), Datum::Decimal64(y)) => f64::from(*x).partial_cmp(&y.to_f64()).unwrap_or(Ordering::Equal),
        (Datum::Decimal64(x), Datum::Integer(y)) => x.to_f64().partial_cmp(&f64::from(*y)).unwrap_or(Ordering::Equal),
        // integer64/double and integer64/decimal64 never mix in arithmetic
        // (spec.md §4.4); ordering falls back to the numeric value anyway
        // so a comparator used outside arithmetic still total-orders them.
        _ => a_as_f64(a).partial_cmp(&a_as_f64(b)).unwrap_or(Ordering::Equal),
    }
}

fn a_as_f64(d: &Datum) -> f64 {
    match d {
        Datum::Integer(n) => f64::from(*n),
        Datum::Integer64(n) => *n as f64,
        Datum::Double(n) => *n,
        Datum::Decimal64(n) => n.to_f64(),
        _ => f64::NAN,
    }
}

/// Orders first by datum variant tag, then within a variant by value
/// (spec.md §4.5), except that numeric kinds share an ordering band and
/// compare by promoted value.
#[must_use]
pub fn before(a: &Datum, b: &Datum) -> Ordering {
    if is_numeric(a) && is_numeric(b) {
        return numeric_cmp(a, b);
    }
    let (ra, rb) = (variant_rank_for_ordering(a), variant_rank_for_ordering(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Datum::Nil, Datum::Nil) => Ordering::Equal,
        (Datum::Boolean(x), Datum::Boolean(y)) => x.cmp(y),
        (Datum::String(x), Datum::String(y)) => x.cmp(y),
        (Datum::Binary(x), Datum::Binary(y)) => x.cmp(y),
        (Datum::Error(x), Datum::Error(y)) => x.code.cmp(&y.code).then_with(|| x.message.cmp(&y.message)),
        (Datum::Date(x), Datum::Date(y)) => x.cmp(y),
        (Datum::Time(x), Datum::Time(y)) => x.cmp(y),
        (Datum::DateTime(x), Datum::DateTime(y)) => x.cmp(y),
        (Datum::DatetimeInterval(x), Datum::DatetimeInterval(y)) => x.cmp(y),
        (Datum::Array(x), Datum::Array(y)) => compare_seq(x.iter(), y.iter()),
        (Datum::MapString(x), Datum::MapString(y)) => {
            compare_seq(x.iter().map(|(_, v)| v), y.iter().map(|(_, v)| v))
        }
        (Datum::MapInt(x), Datum::MapInt(y)) => compare_seq(x.iter().map(|(_, v)| v), y.iter().map(|(_, v)| v)),
        (Datum::UserDefined(x), Datum::UserDefined(y)) => compare_user_defined(x, y),
        _ => Ordering::Equal,
    }
}

fn compare_seq<'a>(mut xs: impl Iterator<Item = &'a Datum>, mut ys: impl Iterator<Item = &'a Datum>) -> Ordering {
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match before(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Orders UDTs of the same kind by their own ordering; unknown (opaque)
/// UDTs fall back to comparing the stable [`crate::heap::HeapId`]
/// assigned at allocation time as the payload pointer analog (spec.md
/// §4.5, DESIGN.md's open-question decision). Callers only reach here
/// once [`variant_rank_for_ordering`] has already established `a` and
/// `b` are the same UDT kind.
fn compare_user_defined(a: &UserDefined, b: &UserDefined) -> Ordering {
    match (a, b) {
        (UserDefined::Pair(x), UserDefined::Pair(y)) => compare_seq(
            std::iter::once(&x.first).chain(std::iter::once(&x.second)),
            std::iter::once(&y.first).chain(std::iter::once(&y.second)),
        ),
        (UserDefined::Symbol(x), UserDefined::Symbol(y)) => x.name().cmp(&y.name()),
        (UserDefined::Set(x), UserDefined::Set(y)) => compare_seq(
            x.to_vec().iter().cloned().collect::<Vec<_>>().iter(),
            y.to_vec().iter().cloned().collect::<Vec<_>>().iter(),
        ),
        (UserDefined::Builtin(x), UserDefined::Builtin(y)) => (*x as u8).cmp(&(*y as u8)),
        (UserDefined::Opaque { type_code: tx, payload: px }, UserDefined::Opaque { type_code: ty, payload: py }) => {
            tx.cmp(ty).then_with(|| px.cmp(py))
        }
        // Procedures and native procedures have no spec-defined ordering
        // beyond type code; tie-break by heap-stable identity via pointer
        // address, which is consistent within a single run.
        (UserDefined::Procedure(x), UserDefined::Procedure(y)) => {
            (std::rc::Rc::as_ptr(x) as usize).cmp(&(std::rc::Rc::as_ptr(y) as usize))
        }
        (UserDefined::NativeProcedure(x), UserDefined::NativeProcedure(y)) => {
            (std::rc::Rc::as_ptr(&x.func) as *const () as usize).cmp(&(std::rc::Rc::as_ptr(&y.func) as *const () as usize))
        }
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_kinds_compare_by_promoted_value_regardless_of_variant_rank() {
        assert_eq!(before(&Datum::Integer(1), &Datum::Double(2.0)), Ordering::Less);
        assert_eq!(before(&Datum::Double(2.0), &Datum::Integer(1)), Ordering::Greater);
    }

    #[test]
    fn different_variants_order_by_rank() {
        assert_eq!(before(&Datum::Nil, &Datum::Boolean(true)), Ordering::Less);
    }

    #[test]
    fn strings_order_lexicographically() {
        assert_eq!(before(&Datum::String("a".into()), &Datum::String("b".into())), Ordering::Less);
    }

    #[test]
    fn arrays_order_lexicographically() {
        let a = Datum::Array(std::rc::Rc::new(vec![Datum::Integer(1), Datum::Integer(2)]));
        let b = Datum::Array(std::rc::Rc::new(vec![Datum::Integer(1), Datum::Integer(3)]));
        assert_eq!(before(&a, &b), Ordering::Less);
    }
}
