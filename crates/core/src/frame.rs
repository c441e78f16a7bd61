//! The frame: a single activation record, spec §3.5/§4.C.
//!
//! Grounded on the teacher's `CallFrame` (`bytecode/vm/mod.rs`): bytecode
//! pointer + stack base + namespace index become a `Feed` + argument slots +
//! varlist context here, since this evaluator walks cell arrays rather than
//! a flat bytecode tape.

use smallvec::SmallVec;

use crate::action::ActionId;
use crate::cell::Cell;
use crate::context::{ContextId, Specifier};
use crate::feed::Feed;
use crate::symbol::Symbol;

/// A root the heap's mark-sweep walk must treat as live, contributed by a
/// live frame, spec §4.B/§4.C. `Series` covers references a frame holds
/// that aren't expressed as a `Cell` (the feed's source array, a reified
/// varlist) so `Heap::recycle` can walk both uniformly.
pub enum GcRoot<'a> {
    Cell(&'a Cell),
    Series(crate::series::SeriesId),
}

/// One activation record, spec §3.5. Every field here corresponds to a
/// named concept in spec §4.C's frame description.
#[derive(Clone)]
pub struct Frame {
    /// Cursor over the block/group currently being evaluated.
    pub feed: Feed,
    /// Argument slots, aligned by index to the called action's `ParamSpec`
    /// list (spec §4.F "Fulfill_Arg" writes into these by position).
    pub args: SmallVec<[Cell; 4]>,
    /// The slot the running native/interpreted body writes its result into.
    pub out: Cell,
    /// Scratch cell for sub-evaluations that must not disturb `out`.
    pub spare: Cell,
    /// Which action is running in this frame, if any (`None` for a bare
    /// top-level "do a block" frame, spec §4.C).
    pub phase: Option<ActionId>,
    /// The word this frame's action was invoked through, for tracebacks and
    /// definitional-RETURN identity (spec §4.H.4).
    pub label: Option<Symbol>,
    /// This frame's reified varlist, eagerly created at push time rather
    /// than lazily on first capture (see DESIGN.md: a deliberate
    /// simplification of spec §9's "frame MAY be reified into a heap
    /// context" memory-saving optimization).
    pub varlist: Option<ContextId>,
    /// The specifier this frame's own body words resolve relative bindings
    /// against, inherited by any sub-feed it creates.
    pub specifier: Specifier,
}

impl Frame {
    /// A bare "evaluate this block" frame with no action running, spec §4.C.
    #[must_use]
    pub fn for_block(feed: Feed, specifier: Specifier) -> Self {
        Self {
            feed,
            args: SmallVec::new(),
            out: Cell::init_null(false),
            spare: Cell::init_null(false),
            phase: None,
            label: None,
            varlist: None,
            specifier,
        }
    }

    /// A frame invoking `action`, with `args` already fulfilled, spec §4.F.
    #[must_use]
    pub fn for_action(
        feed: Feed,
        action: ActionId,
        label: Option<Symbol>,
        args: SmallVec<[Cell; 4]>,
        varlist: Option<ContextId>,
        specifier: Specifier,
    ) -> Self {
        Self {
            feed,
            args,
            out: Cell::init_null(false),
            spare: Cell::init_null(false),
            phase: Some(action),
            label,
            varlist,
            specifier,
        }
    }

    /// GC roots this frame contributes, spec §4.B "keep-alive via frame
    /// chain": the feed's source array, every argument, the output/spare
    /// slots, and (if reified) the varlist.
    pub fn gc_roots(&self) -> impl Iterator<Item = GcRoot<'_>> {
        std::iter::once(GcRoot::Series(self.feed.array()))
            .chain(self.args.iter().map(GcRoot::Cell))
            .chain(std::iter::once(GcRoot::Cell(&self.out)))
            .chain(std::iter::once(GcRoot::Cell(&self.spare)))
            .chain(self.varlist.map(|c| GcRoot::Series(c.series_id())))
    }
}
