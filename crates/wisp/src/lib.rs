#![doc = include_str!("../../../README.md")]
#![expect(clippy::module_name_repetitions, reason = "Datum/datum.rs naming mirrors the rest of the pack")]

mod builtins;
mod datum;
mod environment;
mod error;
mod evaluator;
mod external;
mod heap;
mod intern;
mod lexer;
mod parser;
mod persistent_set;
mod printer;
mod resolve;
pub mod run;

pub use crate::datum::{Builtin, Datum, ErrorData, NativeFn, NativeProcedure, PairNode, Procedure, UserDefined};
pub use crate::environment::Environment;
pub use crate::error::{EvalResult, RunError, Span, SyntaxError, SyntaxErrorKind};
pub use crate::external::{DatetimeInterval, Decimal64, decimal_double_eq};
pub use crate::heap::{Heap, HeapId};
pub use crate::intern::{EntryCell, Interner, Symbol};
pub use crate::parser::{parse_all_with_heap, parse_one, parse_one_with_heap};
pub use crate::persistent_set::PersistentSet;
pub use crate::printer::print;
pub use crate::run::{DefineOutcome, Interpreter};
