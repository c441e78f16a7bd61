//! Series: variable-length heterogeneous/homogeneous containers, spec §3.2.
//!
//! Grounded on the teacher's `heap.rs` arena-with-free-list idiom (`HeapId`,
//! `HeapStats`, `HeapDiff`) but reworked around the mark-sweep GC contract
//! spec §4.B requires instead of the teacher's reference counting: a series
//! is freed only by `Heap::recycle`'s sweep, never by a refcount hitting
//! zero.

use std::fmt;

use crate::cell::Cell;

/// Unique identifier for a series stored in the `Heap` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SeriesId(pub(crate) u32);

impl SeriesId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Debugging/GC-rule flavor tag, spec §3.2 ("flavor tag for debugging and GC
/// rules").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Flavor {
    Array,
    Strand,
    Binary,
    Context,
}

/// Whether a series is owned by the GC or by an explicit C-level-equivalent
/// caller, spec §3.2/§4.B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ManagedState {
    Unmanaged,
    Managed,
}

/// A per-flavor opaque slot interpreted by whoever understands the flavor,
/// spec §3.2 ("`link` slot, a `misc` slot, both interpreted per-flavor").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SidecarSlot {
    None,
    Series(SeriesId),
    Index(u32),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum SeriesData {
    /// An array of cells (blocks, groups, paths, frames, objects, actions).
    /// The terminator is implicit (spec §3.2: "arrays always have capacity
    /// for it"); we model that as the invariant that `Vec::len()` is the
    /// logical length and `term_len` always agrees with it, rather than
    /// storing a physical end cell, since Rust's `Vec` already tracks length
    /// safely.
    Array(Vec<Cell>),
    /// Code-point string. Byte offsets are cached lazily (see
    /// `Strand::char_to_byte`) rather than kept in lockstep on every edit,
    /// since Rebol strings are mutated far less often than read.
    Strand(String),
    Binary(Vec<u8>),
}

impl SeriesData {
    #[must_use]
    pub fn flavor(&self) -> Flavor {
        match self {
            Self::Array(_) => Flavor::Array,
            Self::Strand(_) => Flavor::Strand,
            Self::Binary(_) => Flavor::Binary,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Cell]> {
        match self {
            Self::Array(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Cell>> {
        match self {
            Self::Array(cells) => Some(cells),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Array(cells) => cells.len(),
            Self::Strand(s) => s.chars().count(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A series: a reference-counted-by-GC, variable-length container, spec
/// §3.2.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Series {
    pub data: SeriesData,
    pub link: SidecarSlot,
    pub misc: SidecarSlot,
    pub managed: ManagedState,
    /// "An array may be frozen deep" — spec §3.2. Shallow freeze is `false`
    /// with an individually-protected head cell; deep freeze additionally
    /// protects every nested array transitively, checked at `freeze_deep`
    /// time rather than re-walked on every write.
    pub frozen_deep: bool,
}

impl Series {
    #[must_use]
    pub fn new_array(capacity: usize) -> Self {
        Self {
            data: SeriesData::Array(Vec::with_capacity(capacity)),
            link: SidecarSlot::None,
            misc: SidecarSlot::None,
            managed: ManagedState::Unmanaged,
            frozen_deep: false,
        }
    }

    #[must_use]
    pub fn new_strand(initial: &str) -> Self {
        Self {
            data: SeriesData::Strand(initial.to_owned()),
            link: SidecarSlot::None,
            misc: SidecarSlot::None,
            managed: ManagedState::Unmanaged,
            frozen_deep: false,
        }
    }

    #[must_use]
    pub fn new_binary(initial: Vec<u8>) -> Self {
        Self {
            data: SeriesData::Binary(initial),
            link: SidecarSlot::None,
            misc: SidecarSlot::None,
            managed: ManagedState::Unmanaged,
            frozen_deep: false,
        }
    }

    /// `extend`, spec §4.A.
    pub fn extend(&mut self, cells: impl IntoIterator<Item = Cell>) {
        if let SeriesData::Array(arr) = &mut self.data {
            arr.extend(cells);
        }
    }

    /// `push`, spec §4.A.
    pub fn push(&mut self, cell: Cell) {
        if let SeriesData::Array(arr) = &mut self.data {
            arr.push(cell);
        }
    }

    /// `pop`, spec §4.A: "`pop` may not leave an end-free state" — trivially
    /// true here since length is tracked by `Vec` itself, there is no
    /// separate physical terminator to desynchronize.
    pub fn pop(&mut self) -> Option<Cell> {
        match &mut self.data {
            SeriesData::Array(arr) => arr.pop(),
            _ => None,
        }
    }

    #[must_use]
    pub fn term_len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn at(&self, idx: usize) -> Option<&Cell> {
        self.data.as_array().and_then(|a| a.get(idx))
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "series#{}", self.0)
    }
}
