//! Fixture-driven evaluator tests, mirroring the teacher's own
//! `datatest-stable`-backed `[[test]] name = "datatest_runner"` target: every
//! `tests/fixtures/*.reb` file is evaluated and its molded result compared
//! against the sibling `*.out` file.

use std::path::Path;

use ren_core::resource::NoLimitTracker;
use ren_core::tracer::NoopTracer;
use ren_core::Interpreter;

fn run_fixture(path: &Path) -> datatest_stable::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let expected_path = path.with_extension("out");
    let expected = std::fs::read_to_string(&expected_path)?;

    let mut interp = Interpreter::startup(NoLimitTracker::default(), NoopTracer)?;
    let value = interp.evaluate(&source)?;
    let molded = interp.runtime.dispatch.mold(&value, &interp.runtime);

    pretty_assertions::assert_eq!(molded.trim(), expected.trim(), "fixture {path:?} did not mold as expected");
    Ok(())
}

datatest_stable::harness!(run_fixture, "tests/fixtures", r"^.*\.reb$");
