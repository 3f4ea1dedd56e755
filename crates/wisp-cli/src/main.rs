//! Thin file-running CLI, intentionally dumber than `wisp-repl`: no
//! interactive mode, no line-editing, just "load a file, run it, print
//! the result or a non-zero exit on error".
//!
//! Grounded on the teacher's `ouros-cli/src/main.rs`: read the path from
//! `argv[1]`, build the interpreter, run, report. The teacher's version
//! also wires in a type checker and an external-function resume loop,
//! neither of which this language's evaluator boundary has a counterpart
//! for, so those go.

use std::process::ExitCode;

use wisp::{Datum, Interpreter, print};

const TYPE_OFFSET: i32 = 1000;
const HEAP_CAPACITY: usize = 64;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: wisp <file.wisp>");
        return ExitCode::FAILURE;
    };

    let source = match std::fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new(TYPE_OFFSET, HEAP_CAPACITY);
    match interp.run_source(&source) {
        Ok(result) => {
            if !matches!(result, Datum::Nil) {
                println!("{}", print(&result));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
