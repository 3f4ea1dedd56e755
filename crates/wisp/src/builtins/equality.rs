//! Structural equality (`equal?`, spec.md §4.5, §8 scenario S6).

use crate::datum::{Datum, UserDefined};
use crate::external::decimal_double_eq;

/// Deep structural equality. Nested numeric leaves must match variant
/// exactly — `2` inside one list and `2.0B` inside another make the lists
/// unequal even though `(= 2 2.0B)` holds, per spec.md §8 scenario S6:
/// the arithmetic cross-kind rule is reserved for bare numeric operands at
/// the top of an `equal?` call, not for values nested inside a pair,
/// array, or map.
pub fn structural_eq(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        (Datum::Nil, Datum::Nil) => true,
        (Datum::Integer(x), Datum::Integer(y)) => x == y,
        (Datum::Integer64(x), Datum::Integer64(y)) => x == y,
        (Datum::Double(x), Datum::Double(y)) => x == y,
        (Datum::Decimal64(x), Datum::Decimal64(y)) => x == y,
        (Datum::Boolean(x), Datum::Boolean(y)) => x == y,
        (Datum::String(x), Datum::String(y)) => x == y,
        (Datum::Binary(x), Datum::Binary(y)) => x == y,
        (Datum::Error(x), Datum::Error(y)) => x.code == y.code && x.message == y.message,
        (Datum::Date(x), Datum::Date(y)) => x == y,
        (Datum::Time(x), Datum::Time(y)) => x == y,
        (Datum::DateTime(x), Datum::DateTime(y)) => x == y,
        (Datum::DatetimeInterval(x), Datum::DatetimeInterval(y)) => x == y,
        (Datum::Array(x), Datum::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| structural_eq(p, q))
        }
        (Datum::MapString(x), Datum::MapString(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|((k1, v1), (k2, v2))| k1 == k2 && structural_eq(v1, v2))
        }
        (Datum::MapInt(x), Datum::MapInt(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|((k1, v1), (k2, v2))| k1 == k2 && structural_eq(v1, v2))
        }
        (Datum::UserDefined(x), Datum::UserDefined(y)) => user_defined_eq(x, y),
        _ => false,
    }
}

fn user_defined_eq(a: &UserDefined, b: &UserDefined) -> bool {
    match (a, b) {
        (UserDefined::Pair(x), UserDefined::Pair(y)) => {
            structural_eq(&x.first, &y.first) && structural_eq(&x.second, &y.second)
        }
        (UserDefined::Symbol(x), UserDefined::Symbol(y)) => x == y,
        (UserDefined::Set(x), UserDefined::Set(y)) => {
            let (xs, ys) = (x.to_vec(), y.to_vec());
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(p, q)| structural_eq(p, q))
        }
        (UserDefined::Builtin(x), UserDefined::Builtin(y)) => x == y,
        (UserDefined::Procedure(x), UserDefined::Procedure(y)) => std::rc::Rc::ptr_eq(x, y),
        (UserDefined::NativeProcedure(x), UserDefined::NativeProcedure(y)) => x == y,
        (UserDefined::Opaque { type_code: tx, payload: px }, UserDefined::Opaque { type_code: ty, payload: py }) => {
            tx == ty && px == py
        }
        _ => false,
    }
}

fn is_bare_numeric(d: &Datum) -> bool {
    matches!(d, Datum::Integer(_) | Datum::Integer64(_) | Datum::Double(_) | Datum::Decimal64(_))
}

/// Cross-kind numeric equality, used only between two operands handed
/// directly to `equal?` (spec.md §4.5's "numeric cross-kind uses the
/// arithmetic `=` rule").
fn numeric_cross_kind_eq(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        (Datum::Integer(x), Datum::Integer(y)) => x == y,
        (Datum::Integer64(x), Datum::Integer64(y)) => x == y,
        (Datum::Double(x), Datum::Double(y)) => x == y,
        (Datum::Decimal64(x), Datum::Decimal64(y)) => x == y,
        (Datum::Integer(x), Datum::Integer64(y)) | (Datum::Integer64(y), Datum::Integer(x)) => i64::from(*x) == *y,
        (Datum::Integer(x), Datum::Double(y)) | (Datum::Double(y), Datum::Integer(x)) => f64::from(*x) == *y,
        (Datum::Integer(x), Datum::Decimal64(y)) | (Datum::Decimal64(y), Datum::Integer(x)) => {
            y.to_f64() == f64::from(*x)
        }
        (Datum::Double(x), Datum::Decimal64(y)) | (Datum::Decimal64(y), Datum::Double(x)) => decimal_double_eq(*y, *x),
        _ => false,
    }
}

/// `equal?`'s top-level pairwise rule: bare numeric operands compare via
/// the arithmetic cross-kind rule, everything else via strict structural
/// equality.
fn equal_pair(a: &Datum, b: &Datum) -> bool {
    if is_bare_numeric(a) && is_bare_numeric(b) {
        numeric_cross_kind_eq(a, b)
    } else {
        structural_eq(a, b)
    }
}

/// `equal?`: 0 or 1 args → true; n-ary walks adjacent pairs (spec.md §4.5).
pub fn equal(args: &[Datum]) -> Datum {
    Datum::Boolean(args.windows(2).all(|pair| equal_pair(&pair[0], &pair[1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::{Interner, Symbol};

    #[test]
    fn lists_compare_structurally() {
        let a = Datum::list(vec![Datum::Integer(1), Datum::Integer(2), Datum::Integer(3)]);
        let b = Datum::list(vec![Datum::Integer(1), Datum::Integer(2), Datum::Integer(3)]);
        assert!(matches!(equal(&[a, b]), Datum::Boolean(true)));
    }

    #[test]
    fn cross_kind_numeric_element_breaks_list_equality() {
        let a = Datum::list(vec![Datum::Integer(1), Datum::Double(2.0), Datum::Integer(3)]);
        let b = Datum::list(vec![Datum::Integer(1), Datum::Integer(2), Datum::Integer(3)]);
        assert!(matches!(equal(&[a, b]), Datum::Boolean(false)));
    }

    #[test]
    fn bare_numeric_operands_use_cross_kind_rule() {
        let a = Datum::Double(2.0);
        let b = Datum::Integer(2);
        assert!(matches!(equal(&[a, b]), Datum::Boolean(true)));
    }

    #[test]
    fn symbols_compare_by_name_regardless_of_encoding() {
        let mut interner = Interner::new();
        let a = Datum::symbol(Symbol::new_out_of_place("abc", &mut interner));
        let b = Datum::symbol(Symbol::new_out_of_place("abc", &mut interner));
        assert!(matches!(equal(&[a, b]), Datum::Boolean(true)));
    }

    #[test]
    fn zero_or_one_arg_is_true() {
        assert!(matches!(equal(&[]), Datum::Boolean(true)));
        assert!(matches!(equal(&[Datum::Integer(1)]), Datum::Boolean(true)));
    }
}
