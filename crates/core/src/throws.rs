//! Labelled non-local exit plumbing, spec §4.I/§4.H.4/§9.
//!
//! Per spec §9 "Design Notes": "do not represent 'thrown' as a value kind;
//! it is a side-channel `(thrown, label, arg)` on the runtime." Grounded on
//! the teacher's own thrown-value side channel in `exception_private.rs`
//! (`RunError::Raise` carrying a payload distinct from a normal return).

use crate::cell::Cell;

/// The active throw payload, set by `throw_value`/`throw_named` and cleared
/// by whichever `CATCH` (or definitional-RETURN match) claims it.
#[derive(Debug, Clone)]
pub struct ThrowState {
    pub label: Cell,
    pub value: Cell,
}

/// Per spec §4.H: "There is no thrown-value cell flag; the sole channel is
/// the return boolean plus a process-wide throw label/arg pair." We model
/// the "process-wide pair" as a field on `Runtime` (see `runtime.rs`) and
/// the "return boolean" as this enum returned alongside a normal `Cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Normal,
    Thrown,
}

impl ThrowState {
    #[must_use]
    pub fn new(label: Cell, value: Cell) -> Self {
        Self { label, value }
    }

    /// Spec §4.H.4: a catch matches when the label cell is identical to
    /// `candidate` under Rebol's "same value" rule. We approximate identity
    /// via `Display` text equality for named throws and via payload
    /// structural equality for action-bound labels (`RETURN`/`UNWIND`); see
    /// `matches_action` for the frame-varlist-identity case actually used by
    /// definitional return.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.label.to_string() == name
    }

    /// Spec §4.H.4: "the running evaluator's catch arm compares the throw
    /// label's binding to its own varlist." Used by a function frame to
    /// recognize its own definitional `RETURN`/`UNWIND` throw.
    #[must_use]
    pub fn matches_varlist(&self, varlist: crate::context::ContextId) -> bool {
        matches!(
            self.label.payload(),
            crate::cell::Payload::Context(ctx) if *ctx == varlist
        )
    }
}
