//! Evaluator tracing infrastructure, spec §9 ambient observability.
//!
//! Grounded on the teacher's `tracer.rs` `VmTracer` trait: a zero-cost,
//! trait-based hook system monomorphized away entirely for [`NoopTracer`].
//! The evaluator is generic over `Tr: EvalTracer` the same way the teacher's
//! `VM` is generic over `Tr: VmTracer`.

use crate::cell::Kind;

/// A single traced event, captured by [`RecordingTracer`].
#[derive(Debug, Clone)]
pub enum TraceEvent {
    StepStart { depth: usize },
    WordLookup { symbol: String, found: bool },
    Dispatch { action_name: String, enfix: bool },
    EnfixDefer { action_name: String },
    Throw { label: String },
    Recycle { freed: usize },
}

/// Hook points the evaluator calls at key moments. Implementations choose
/// what (if anything) to record.
pub trait EvalTracer {
    fn on_step_start(&mut self, _depth: usize) {}
    fn on_word_lookup(&mut self, _symbol: &str, _found: bool) {}
    fn on_dispatch(&mut self, _action_name: &str, _enfix: bool) {}
    fn on_enfix_defer(&mut self, _action_name: &str) {}
    fn on_throw(&mut self, _label: &str) {}
    fn on_recycle(&mut self, _freed: usize) {}
    fn on_scan_token(&mut self, _kind: Kind) {}
}

/// Production default: every hook compiles away via monomorphization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Human-readable trace to stderr, for interactive debugging.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_step_start(&mut self, depth: usize) {
        eprintln!("[step] depth={depth}");
    }

    fn on_word_lookup(&mut self, symbol: &str, found: bool) {
        eprintln!("[lookup] {symbol} found={found}");
    }

    fn on_dispatch(&mut self, action_name: &str, enfix: bool) {
        eprintln!("[dispatch] {action_name} enfix={enfix}");
    }

    fn on_enfix_defer(&mut self, action_name: &str) {
        eprintln!("[defer] {action_name}");
    }

    fn on_throw(&mut self, label: &str) {
        eprintln!("[throw] {label}");
    }

    fn on_recycle(&mut self, freed: usize) {
        eprintln!("[recycle] freed={freed}");
    }
}

/// Full event recording, for tests and post-mortem inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    pub events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvalTracer for RecordingTracer {
    fn on_step_start(&mut self, depth: usize) {
        self.events.push(TraceEvent::StepStart { depth });
    }

    fn on_word_lookup(&mut self, symbol: &str, found: bool) {
        self.events.push(TraceEvent::WordLookup {
            symbol: symbol.to_owned(),
            found,
        });
    }

    fn on_dispatch(&mut self, action_name: &str, enfix: bool) {
        self.events.push(TraceEvent::Dispatch {
            action_name: action_name.to_owned(),
            enfix,
        });
    }

    fn on_enfix_defer(&mut self, action_name: &str) {
        self.events.push(TraceEvent::EnfixDefer {
            action_name: action_name.to_owned(),
        });
    }

    fn on_throw(&mut self, label: &str) {
        self.events.push(TraceEvent::Throw { label: label.to_owned() });
    }

    fn on_recycle(&mut self, freed: usize) {
        self.events.push(TraceEvent::Recycle { freed });
    }
}
