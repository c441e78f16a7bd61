//! The top-level `Runtime`: the single object confining all process-wide
//! mutable state, spec §9 ("Global mutable state... confine to one Runtime
//! object; library entry points take `&mut Runtime`").
//!
//! Grounded on the teacher's `VM` struct (`bytecode/vm/mod.rs`), which
//! likewise bundles interning, the heap, call frames and a tracer behind one
//! generic struct rather than scattering them as statics.

use crate::action::ActionTable;
use crate::context::ContextId;
use crate::dispatch::DispatchTable;
use crate::heap::Heap;
use crate::resource::ResourceTracker;
use crate::stacks::{CallStack, DataStack};
use crate::symbol::SymbolTable;
use crate::throws::ThrowState;
use crate::tracer::{EvalTracer, NoopTracer};

/// Boot phases, spec §6 "Boot phases (observable)". Some operations
/// (notably error construction) are unavailable before `Errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootPhase {
    Start,
    Loaded,
    Errors,
    Mezz,
    Done,
}

/// The process-wide state a single interpreter instance owns, spec §5
/// "Shared resources... all live on a single conceptual task."
pub struct Runtime<T: ResourceTracker, Tr: EvalTracer = NoopTracer> {
    pub symbols: SymbolTable,
    pub heap: Heap<T>,
    pub actions: ActionTable<T, Tr>,
    pub dispatch: DispatchTable<T, Tr>,
    pub data_stack: DataStack,
    pub calls: CallStack,
    pub tracer: Tr,
    /// The active throw payload, spec §9 "do not represent thrown as a
    /// value kind." `None` means no throw is in flight.
    pub thrown: Option<ThrowState>,
    pub boot_phase: BootPhase,
    /// The root "system object" context, populated during `Sysobj`/`Base`
    /// boot sub-blocks (spec §6); `None` before `Loaded`.
    pub system: Option<ContextId>,
}

impl<T: ResourceTracker, Tr: EvalTracer> Runtime<T, Tr> {
    #[must_use]
    pub fn new(tracker: T, tracer: Tr) -> Self {
        Self {
            symbols: SymbolTable::new(),
            heap: Heap::new(tracker),
            actions: ActionTable::default(),
            dispatch: DispatchTable::new(),
            data_stack: DataStack::new(),
            calls: CallStack::new(),
            tracer,
            thrown: None,
            boot_phase: BootPhase::Start,
            system: None,
        }
    }

    /// Runs a mark-sweep collection pass over the live frame chain plus
    /// explicit roots/guards, spec §4.B. Callers (the evaluator's safe
    /// points, spec §4.H.1) invoke this between steps or on allocation
    /// pressure.
    pub fn recycle(&mut self) {
        let freed_before = self.heap.stats().free_slots;
        self.heap.recycle(self.calls.iter_roots());
        let freed_after = self.heap.stats().free_slots;
        self.tracer.on_recycle(freed_after.saturating_sub(freed_before));
    }

    /// Raises an error, setting no throw state; callers convert this into
    /// `RunResult::Err` directly rather than routing it through `thrown`
    /// (spec §9: fail and throw are distinct channels).
    pub fn require_phase(&self, phase: BootPhase) -> Result<(), crate::errors::FailError> {
        if self.boot_phase < phase {
            return Err(crate::errors::FailError::simple(
                crate::errors::ErrorId::NotBoundToContext,
                format!("operation requires boot phase >= {phase:?}, runtime is at {:?}", self.boot_phase),
            ));
        }
        Ok(())
    }

    /// Sets the throw side-channel, spec §4.I/§9.
    pub fn throw_value(&mut self, label: crate::cell::Cell, value: crate::cell::Cell) {
        self.tracer.on_throw(&label.to_string());
        self.thrown = Some(ThrowState::new(label, value));
    }

    /// Clears and returns the throw side-channel, for a `CATCH`/definitional
    /// return that just matched it.
    pub fn take_thrown(&mut self) -> Option<ThrowState> {
        self.thrown.take()
    }
}
