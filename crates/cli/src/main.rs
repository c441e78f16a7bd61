//! Thin host REPL binary for exercising `ren-core`, mirroring the teacher's
//! own standalone REPL binary (`ouros`'s `bin/ouros-repl.rs`): a file-run
//! mode plus a line-buffered interactive loop, kept deliberately free of any
//! dependency beyond the core crate itself.

use std::io::{self, Write};
use std::process::ExitCode;

use ren_core::resource::NoLimitTracker;
use ren_core::tracer::NoopTracer;
use ren_core::{Cell, Interpreter, RunResult};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut interp = match Interpreter::startup(NoLimitTracker::default(), NoopTracer) {
        Ok(i) => i,
        Err(err) => {
            eprintln!("failed to boot runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = run_snippet(&mut interp, &source) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let mut source = String::new();
    loop {
        let prompt = if source.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }

        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        if needs_more_input(&source) {
            continue;
        }

        if let Err(err) = run_snippet(&mut interp, &source) {
            eprintln!("{err}");
        }
        source.clear();
    }

    ExitCode::SUCCESS
}

/// Evaluates one source snippet and prints its molded result, the way the
/// teacher's REPL prints an expression's value unless it's the unit/`None`
/// result of a bare statement.
fn run_snippet(interp: &mut Interpreter<NoLimitTracker, NoopTracer>, source: &str) -> RunResult<()> {
    let value = interp.evaluate(source)?;
    print_result(interp, &value);
    Ok(())
}

fn print_result(interp: &Interpreter<NoLimitTracker, NoopTracer>, value: &Cell) {
    if value.kind() == ren_core::Kind::Void {
        return;
    }
    println!("{}", interp.runtime.dispatch.mold(value, &interp.runtime));
}

/// Heuristic multiline detector: keeps reading lines while brackets are
/// unbalanced, matching the teacher's own REPL's bracket-depth heuristic.
fn needs_more_input(source: &str) -> bool {
    let mut balance = 0i32;
    for ch in source.chars() {
        match ch {
            '[' | '(' => balance += 1,
            ']' | ')' => balance -= 1,
            _ => {}
        }
    }
    balance > 0
}

/// Reads one line from stdin after printing a prompt. Returns `None` on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
