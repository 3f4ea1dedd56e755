//! `set`/`set-contains?`/`set-insert`/`set-remove` builtins (spec.md §4.5,
//! §4.7).

use crate::builtins::comparator::before;
use crate::datum::{Datum, UserDefined};
use crate::error::{EvalResult, RunError};
use crate::persistent_set::PersistentSet;

fn as_set<'a>(name: &str, d: &'a Datum) -> EvalResult<&'a PersistentSet> {
    match d {
        Datum::UserDefined(UserDefined::Set(s)) => Ok(s),
        _ => Err(RunError::signal(-1, format!("{name}: argument must be a set"))),
    }
}

/// `set`: fold all arguments into a persistent set under the standard
/// comparator (spec.md §4.5).
pub fn set(args: &[Datum]) -> EvalResult<Datum> {
    let built = args.iter().fold(PersistentSet::empty(), |acc, value| acc.insert(value.clone(), &before));
    Ok(Datum::UserDefined(UserDefined::Set(built)))
}

pub fn set_contains(args: &[Datum]) -> EvalResult<Datum> {
    let [set_arg, value] = args else {
        return Err(RunError::signal(-1, format!("set-contains? takes 2 arguments, was invoked with {}", args.len())));
    };
    let set = as_set("set-contains?", set_arg)?;
    Ok(Datum::Boolean(set.contains(value, &before)))
}

pub fn set_insert(args: &[Datum]) -> EvalResult<Datum> {
    let [set_arg, value] = args else {
        return Err(RunError::signal(-1, format!("set-insert takes 2 arguments, was invoked with {}", args.len())));
    };
    let set = as_set("set-insert", set_arg)?;
    Ok(Datum::UserDefined(UserDefined::Set(set.insert(value.clone(), &before))))
}

pub fn set_remove(args: &[Datum]) -> EvalResult<Datum> {
    let [set_arg, value] = args else {
        return Err(RunError::signal(-1, format!("set-remove takes 2 arguments, was invoked with {}", args.len())));
    };
    let set = as_set("set-remove", set_arg)?;
    Ok(Datum::UserDefined(UserDefined::Set(set.remove(value, &before))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_roundtrips_contains_insert_remove() {
        let s = set(&[Datum::Integer(3), Datum::Integer(1), Datum::Integer(4)]).unwrap();
        assert!(matches!(set_contains(&[s.clone(), Datum::Integer(1)]).unwrap(), Datum::Boolean(true)));
        let removed = set_remove(&[s.clone(), Datum::Integer(1)]).unwrap();
        assert!(matches!(set_contains(&[removed, Datum::Integer(1)]).unwrap(), Datum::Boolean(false)));
        assert!(matches!(set_contains(&[s, Datum::Integer(1)]).unwrap(), Datum::Boolean(true)));
    }

    #[test]
    fn set_insert_on_non_set_errors() {
        assert!(set_insert(&[Datum::Integer(1), Datum::Integer(2)]).is_err());
    }
}
