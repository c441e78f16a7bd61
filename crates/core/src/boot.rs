//! The boot sequence, spec §6: drives `Runtime::boot_phase` through its
//! states by walking a compressed boot blob's sub-block order, the way the
//! real bootstrap loads a gzipped `%boot-xxx.r` payload rather than parsing
//! loose text at startup.
//!
//! Grounded on the teacher's own startup sequencer (`prepare.rs`'s staged
//! module-table construction ahead of running user code): a fixed, ordered
//! sweep of named stages, each one populating more of the runtime before the
//! next becomes legal to run.
//!
//! Out of scope (spec §1 Non-goals: "reimplementing the mezzanine
//! bootstrap"): the blob here is a placeholder recording only the sub-block
//! *order*, not actual Rebol source for `sysobj`/`base`/`sys`/`mezz`. Those
//! labels still advance `boot_phase` so callers can rely on the phase
//! machine's shape without this runtime carrying a full mezzanine library.

use crate::errors::{ErrorId, EvalError, FailError, RunResult};
use crate::resource::ResourceTracker;
use crate::runtime::{BootPhase, Runtime};
use crate::tracer::EvalTracer;

/// Gzip-compressed sub-block label listing, spec §6 "(boot types typespecs
/// words generics natives errors sysobj base sys mezz)". Generated ahead of
/// time (see `boot/blob.txt`); decompressed here with `flate2` rather than
/// re-deriving it, the same way the teacher embeds its own frozen snapshot
/// data with `include_bytes!` instead of regenerating it at build time.
static BOOT_BLOB_GZ: &[u8] = include_bytes!("../boot/blob.gz");

const EXPECTED_LABELS: &[&str] = &[
    "boot", "types", "typespecs", "words", "generics", "natives", "errors", "sysobj", "base", "sys", "mezz",
];

fn decompress_boot_blob() -> RunResult<String> {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(BOOT_BLOB_GZ);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| EvalError::internal(format!("boot blob is not valid gzip/utf8: {e}")))?;
    Ok(text)
}

/// Runs the full boot sequence once on a freshly-constructed `Runtime`,
/// spec §6's observable phases: `Start -> Loaded -> Errors -> Mezz -> Done`.
/// Idempotent guard: calling this twice on an already-`Done` runtime is a
/// caller bug, not a recoverable condition (see `errors::panic_core`).
pub fn boot<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>) -> RunResult<()> {
    if rt.boot_phase != BootPhase::Start {
        crate::errors::panic_core("boot() called on a Runtime that has already booted");
    }

    let blob = decompress_boot_blob()?;
    let labels: Vec<&str> = blob.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if labels != EXPECTED_LABELS {
        return Err(FailError::simple(ErrorId::ScanMismatch, "boot blob sub-block order does not match the expected sequence").into());
    }

    for label in labels {
        match label {
            "words" => {
                // `words`: intern every symbol the native/generic tables
                // will need by name before anything tries to look one up,
                // spec §6 "words... are interned ahead of any user code".
                for word in PRELOADED_WORDS {
                    rt.symbols.intern(word);
                }
                rt.boot_phase = BootPhase::Loaded;
            }
            "natives" => {
                let ctx = crate::natives::install(rt)?;
                rt.system = Some(ctx);
            }
            "errors" => {
                rt.boot_phase = BootPhase::Errors;
            }
            "mezz" => {
                rt.boot_phase = BootPhase::Mezz;
            }
            _ => {}
        }
    }

    rt.boot_phase = BootPhase::Done;
    Ok(())
}

/// Words the boot blob's `natives`/`errors` sub-blocks reference by name
/// ahead of time, spec §6. Kept short and representative rather than the
/// full mezzanine vocabulary (out of scope, see module doc).
const PRELOADED_WORDS: &[&str] = &[
    "add", "subtract", "multiply", "divide", "equal?", "+", "-", "*", "/", "=", "if", "else", "then", "also", "do",
    "reduce", "comment", "elide", "catch", "throw", "func", "return", "anonymous", "--generic-throw--",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;
    use crate::tracer::NoopTracer;

    #[test]
    fn boot_reaches_done_and_installs_natives() {
        let mut rt = Runtime::<NoLimitTracker, NoopTracer>::new(NoLimitTracker::default(), NoopTracer);
        boot(&mut rt).expect("boot succeeds");
        assert_eq!(rt.boot_phase, BootPhase::Done);
        assert!(rt.system.is_some());
        assert!(rt.symbols.lookup("add").is_some());
    }
}
