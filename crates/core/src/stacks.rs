//! The data stack and the call (frame) stack, spec §3.5/§4.C.
//!
//! Grounded on the teacher's `CallFrame` stack in `bytecode/vm/mod.rs`: a
//! flat `Vec` of frames, with the running frame always the last element.

use crate::cell::Cell;
use crate::frame::{Frame, GcRoot};

/// The evaluator's data stack: a scratch area natives push intermediate
/// results onto (e.g. collecting `reduce` results, gathering path picks),
/// spec §4.C.
#[derive(Debug, Default)]
pub struct DataStack {
    cells: Vec<Cell>,
}

impl DataStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn pop(&mut self) -> Option<Cell> {
        self.cells.pop()
    }

    /// Drains everything pushed since `mark` into a fresh array-backed
    /// `Vec`, spec §4.C ("pop a marked run of the data stack into a new
    /// array"), used by `reduce`/`compose`/path evaluation.
    pub fn drain_from(&mut self, mark: usize) -> Vec<Cell> {
        self.cells.split_off(mark)
    }

    #[must_use]
    pub fn mark(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}

/// The call stack: every live `Frame`, oldest (outermost) first. The running
/// frame is always `frames.last()`, spec §3.5/§4.C.
#[derive(Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Every frame's argument/output/spare cells and referenced series,
    /// oldest first, for the heap's mark-sweep "frame chain" root set, spec
    /// §4.B.
    pub fn iter_roots(&self) -> impl Iterator<Item = GcRoot<'_>> {
        self.frames.iter().flat_map(Frame::gc_roots)
    }

    /// Walks from the innermost frame outward, used to resolve a throw label
    /// against the frame whose definitional-RETURN varlist identity matches
    /// it, spec §4.H.4/§4.I.
    pub fn iter_rev_mut(&mut self) -> impl Iterator<Item = &mut Frame> {
        self.frames.iter_mut().rev()
    }
}
