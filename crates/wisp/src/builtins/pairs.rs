//! Pair, list, and `apply`/`raise` builtins (spec.md §4.5).
//!
//! Grounded on the teacher's `modules/collections.rs`, which implements
//! the same shape of accessor-plus-arity-check natives over its own
//! sequence types.

use crate::datum::Datum;
use crate::error::{EvalResult, RunError};

pub fn pair_p(args: &[Datum]) -> EvalResult<Datum> {
    let [arg] = args else { return arity_error("pair?", 1, args.len()) };
    Ok(Datum::Boolean(arg.as_pair().is_some()))
}

pub fn pair(args: &[Datum]) -> EvalResult<Datum> {
    let [first, second] = args else { return arity_error("pair", 2, args.len()) };
    Ok(Datum::pair(first.clone(), second.clone()))
}

pub fn pair_first(args: &[Datum]) -> EvalResult<Datum> {
    let [arg] = args else { return arity_error("pair-first", 1, args.len()) };
    let pair = arg.as_pair().ok_or_else(|| RunError::signal(-1, "pair-first: argument must be a pair"))?;
    Ok(pair.first.clone())
}

pub fn pair_second(args: &[Datum]) -> EvalResult<Datum> {
    let [arg] = args else { return arity_error("pair-second", 1, args.len()) };
    let pair = arg.as_pair().ok_or_else(|| RunError::signal(-1, "pair-second: argument must be a pair"))?;
    Ok(pair.second.clone())
}

pub fn null_p(args: &[Datum]) -> EvalResult<Datum> {
    let [arg] = args else { return arity_error("null?", 1, args.len()) };
    Ok(Datum::Boolean(arg.is_nil()))
}

pub fn list(args: &[Datum]) -> EvalResult<Datum> {
    Ok(Datum::list(args.to_vec()))
}

fn arity_error(name: &str, expected: usize, got: usize) -> EvalResult<Datum> {
    Err(RunError::signal(-1, format!("{name} takes {expected} arguments, was invoked with {got}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_accessors_round_trip() {
        let p = pair(&[Datum::Integer(1), Datum::Integer(2)]).unwrap();
        assert!(matches!(pair_p(&[p.clone()]).unwrap(), Datum::Boolean(true)));
        assert!(matches!(pair_first(&[p.clone()]).unwrap(), Datum::Integer(1)));
        assert!(matches!(pair_second(&[p]).unwrap(), Datum::Integer(2)));
    }

    #[test]
    fn pair_first_on_non_pair_errors() {
        assert!(pair_first(&[Datum::Integer(1)]).is_err());
    }

    #[test]
    fn null_p_detects_nil() {
        assert!(matches!(null_p(&[Datum::Nil]).unwrap(), Datum::Boolean(true)));
        assert!(matches!(null_p(&[Datum::Integer(0)]).unwrap(), Datum::Boolean(false)));
    }

    #[test]
    fn list_builds_a_proper_list() {
        let l = list(&[Datum::Integer(1), Datum::Integer(2)]).unwrap();
        assert_eq!(l.proper_list_to_vec().unwrap().len(), 2);
    }
}
