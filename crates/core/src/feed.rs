//! The feed: a one-cell-lookahead iterator over an array series, spec §4.G.
//!
//! Grounded on the teacher's `CallFrame` bytecode cursor (`ip`/`code`
//! pairing in `bytecode/vm/mod.rs`), generalized from a flat instruction
//! tape to an array-of-cells tape with a resolved lookahead slot instead of
//! raw opcode bytes.

use crate::cell::Cell;
use crate::context::Specifier;
use crate::errors::RunResult;
use crate::resource::ResourceTracker;
use crate::series::SeriesId;
use crate::tracer::EvalTracer;

/// Feed flags, spec §4.G (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedFlags(u8);

impl FeedFlags {
    /// Suppresses the evaluator's enfix lookahead for exactly one step (set
    /// right after a left-quoting "steal", spec §4.H.2).
    pub const NO_LOOKAHEAD: Self = Self(1 << 0);
    /// An enfix op was seen but deferred (spec §4.H.2 `then`/`else`/`also`
    /// single-step defer) and is waiting to be picked back up.
    pub const DEFERRING_ENFIX: Self = Self(1 << 1);
    /// The feed hit a `|` (or end-of-array) evaluation barrier.
    pub const BARRIER_HIT: Self = Self(1 << 2);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// A one-element-lookahead cursor over `array`'s cells, spec §4.G: "the feed
/// always holds the next not-yet-consumed cell already fetched and
/// derelativized, so the evaluator can classify it (check for enfix) before
/// committing to consume it."
#[derive(Debug, Clone)]
pub struct Feed {
    array: SeriesId,
    index: u32,
    specifier: Specifier,
    lookahead: Option<Cell>,
    flags: FeedFlags,
}

impl Feed {
    /// Creates a feed positioned before `array`'s first cell and immediately
    /// pre-fetches it, spec §4.G.
    #[must_use]
    pub fn new<T: ResourceTracker>(heap: &crate::heap::Heap<T>, array: SeriesId, specifier: Specifier) -> Self {
        let mut feed = Self {
            array,
            index: 0,
            specifier,
            lookahead: None,
            flags: FeedFlags::empty(),
        };
        feed.prefetch(heap);
        feed
    }

    fn prefetch<T: ResourceTracker>(&mut self, heap: &crate::heap::Heap<T>) {
        self.lookahead = heap
            .get(self.array)
            .at(self.index as usize)
            .map(|c| c.derelativize(&self.specifier));
    }

    /// Peeks the pending cell without consuming it, spec §4.G
    /// ("lookahead... check for enfix before committing").
    #[must_use]
    pub fn peek(&self) -> Option<&Cell> {
        self.lookahead.as_ref()
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.lookahead.is_none()
    }

    /// Consumes the pending cell and pre-fetches the next one, spec §4.G.
    pub fn consume<T: ResourceTracker>(&mut self, heap: &crate::heap::Heap<T>) -> Option<Cell> {
        let current = self.lookahead.take()?;
        self.index += 1;
        self.prefetch(heap);
        Some(current)
    }

    #[must_use]
    pub fn specifier(&self) -> &Specifier {
        &self.specifier
    }

    #[must_use]
    pub fn flags(&self) -> FeedFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: FeedFlags) {
        self.flags.set(flag);
    }

    pub fn clear_flag(&mut self, flag: FeedFlags) {
        self.flags.clear(flag);
    }

    #[must_use]
    pub fn array(&self) -> SeriesId {
        self.array
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Re-seats a feed at a previously-recorded `(array, index)` position,
    /// spec §4.G: used to resume a VARARGS! handle, which snapshots a feed
    /// position rather than holding a live borrow of one.
    fn resume<T: ResourceTracker>(heap: &crate::heap::Heap<T>, array: SeriesId, index: u32, specifier: Specifier) -> Self {
        let mut feed = Self {
            array,
            index,
            specifier,
            lookahead: None,
            flags: FeedFlags::empty(),
        };
        feed.prefetch(heap);
        feed
    }
}

/// Pulls one value out of a VARARGS! handle, spec §4.G "pulls values
/// lazily": resumes a throwaway feed at the handle's snapshotted position,
/// evaluates one full expression from it, and reports the handle's new
/// position for the next pull. Returns `Ok(None)` once the underlying array
/// is exhausted.
pub fn take_variadic_value<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut crate::runtime::Runtime<T, Tr>,
    array: SeriesId,
    index: u32,
) -> RunResult<Option<(Cell, u32)>> {
    let mut feed = Feed::resume(&rt.heap, array, index, Specifier::None);
    if feed.is_at_end() {
        return Ok(None);
    }
    let value = crate::evaluator::eval_full_expression(rt, &mut feed)?;
    Ok(Some((value, feed.index())))
}
