//! Memory/GC contract, spec §4.B.
//!
//! Grounded on the teacher's `heap.rs` arena-with-free-list (`HeapStats`,
//! `HeapDiff`) but implementing mark-sweep over explicit roots/guards/frame
//! chain rather than the teacher's reference counting, per spec §4.B and §9
//! ("Global mutable state... confine to one `Runtime` object").
//!
//! Contexts and actions are themselves arrays stored in this same arena
//! (their varlist/paramlist), so one mark-sweep pass covers all of §3.2's
//! "blocks, groups, paths, frames, objects, actions" uniformly.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::cell::{Binding, Cell, Payload};
use crate::frame::GcRoot;
use crate::resource::ResourceTracker;
use crate::series::{ManagedState, Series, SeriesId};

enum Slot {
    Occupied(Series),
    Free(Option<u32>),
}

/// Scoped guard: a series or cell pinned against collection while some
/// routine holds a reference not otherwise reachable from a root, spec §4.B.
/// Guards are LIFO; `Heap::unguard` panics (a debug assertion per spec §4.B)
/// if called out of order.
pub struct GuardHandle(usize);

/// Snapshot of heap state, spec §4.B / teacher's `HeapStats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    pub live_series: usize,
    pub free_slots: usize,
    pub total_slots: usize,
    pub by_flavor: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDiff {
    pub live_series_delta: isize,
    pub free_slots_delta: isize,
}

impl HeapStats {
    #[must_use]
    pub fn diff(&self, after: &Self) -> HeapDiff {
        HeapDiff {
            live_series_delta: after.live_series as isize - self.live_series as isize,
            free_slots_delta: after.free_slots as isize - self.free_slots as isize,
        }
    }
}

/// The managed arena plus the GC contract's roots and guards, spec §4.B.
pub struct Heap<T: ResourceTracker> {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    /// "A set of cells outside the value heap whose contents are treated as
    /// live" — spec §4.B.
    roots: Vec<Cell>,
    /// LIFO guard stack; push on entry to a routine, pop guaranteed on every
    /// exit path including fail unwinds (spec §4.B, §5).
    guards: Vec<SeriesId>,
    tracker: T,
}

impl<T: ResourceTracker> Heap<T> {
    #[must_use]
    pub fn new(tracker: T) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            roots: Vec::new(),
            guards: Vec::new(),
            tracker,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    /// `alloc_singular` / `make_array`-backing allocation. Allocation
    /// failure raises a fail per spec §4.B.
    pub fn alloc(&mut self, series: Series) -> Result<SeriesId, crate::errors::FailError> {
        self.tracker
            .charge_allocation(series.data.len())
            .map_err(|e| crate::errors::FailError::from_resource(&e))?;
        if let Some(idx) = self.free_head {
            let Slot::Free(next) = self.slots[idx as usize] else {
                unreachable!("free list corrupted")
            };
            self.free_head = next;
            self.slots[idx as usize] = Slot::Occupied(series);
            Ok(SeriesId(idx))
        } else {
            let idx = u32::try_from(self.slots.len()).expect("heap overflow");
            self.slots.push(Slot::Occupied(series));
            Ok(SeriesId(idx))
        }
    }

    #[must_use]
    pub fn get(&self, id: SeriesId) -> &Series {
        match &self.slots[id.index()] {
            Slot::Occupied(s) => s,
            Slot::Free(_) => panic!("use-after-free: {id} was swept"),
        }
    }

    pub fn get_mut(&mut self, id: SeriesId) -> Result<&mut Series, crate::errors::FailError> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(s) => {
                if s.frozen_deep {
                    return Err(crate::errors::FailError::protected_write());
                }
                Ok(s)
            }
            Slot::Free(_) => panic!("use-after-free: {id} was swept"),
        }
    }

    pub fn manage(&mut self, id: SeriesId) {
        if let Slot::Occupied(s) = &mut self.slots[id.index()] {
            s.managed = ManagedState::Managed;
        }
    }

    /// `freeze_deep`, spec §4.A/§3.2.
    pub fn freeze_deep(&mut self, id: SeriesId) {
        let mut stack = vec![id];
        let mut seen = AHashSet::new();
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if let Slot::Occupied(s) = &mut self.slots[cur.index()] {
                s.frozen_deep = true;
                if let Some(cells) = s.data.as_array() {
                    for cell in cells {
                        if let Some(child) = series_ref(cell) {
                            stack.push(child);
                        }
                    }
                }
            }
        }
    }

    /// Pushes a root-equivalent guard, spec §4.B. Returns a handle that must
    /// be released via `unguard` in LIFO order.
    pub fn guard(&mut self, id: SeriesId) -> GuardHandle {
        self.guards.push(id);
        GuardHandle(self.guards.len() - 1)
    }

    /// Pops a guard. Panics (debug assertion, spec §4.B) if `handle` is not
    /// the top of the guard stack, catching imbalanced push/pop.
    pub fn unguard(&mut self, handle: GuardHandle) {
        assert_eq!(
            handle.0 + 1,
            self.guards.len(),
            "unbalanced GC guard pop: guards must release in LIFO order"
        );
        self.guards.pop();
    }

    pub fn add_root(&mut self, cell: Cell) {
        self.roots.push(cell);
    }

    /// Runs a mark-sweep collection pass, spec §4.B: "A managed series is
    /// reachable from either a root, a live frame, a live cell, or an
    /// explicit GC guard; otherwise it is eligible for collection."
    ///
    /// `frame_roots` supplies the extra series/cells contributed by every
    /// live frame (spec §4.B "keep-alive via frame chain"); the evaluator's
    /// call stack owns that enumeration.
    pub fn recycle<'a>(&mut self, frame_roots: impl Iterator<Item = GcRoot<'a>>) {
        let mut live = AHashSet::new();
        let mut frontier = Vec::new();

        for id in &self.guards {
            frontier.push(*id);
        }
        for cell in &self.roots {
            if let Some(id) = series_ref(cell) {
                frontier.push(id);
            }
        }
        for root in frame_roots {
            match root {
                GcRoot::Cell(cell) => {
                    if let Some(id) = series_ref(cell) {
                        frontier.push(id);
                    }
                }
                GcRoot::Series(id) => frontier.push(id),
            }
        }

        while let Some(id) = frontier.pop() {
            if !live.insert(id) {
                continue;
            }
            if let Slot::Occupied(s) = &self.slots[id.index()] {
                if let Some(cells) = s.data.as_array() {
                    for cell in cells {
                        if let Some(child) = series_ref(cell) {
                            frontier.push(child);
                        }
                    }
                }
                if let crate::series::SidecarSlot::Series(link) = s.link {
                    frontier.push(link);
                }
                if let crate::series::SidecarSlot::Series(misc) = s.misc {
                    frontier.push(misc);
                }
            }
        }

        for idx in 0..self.slots.len() {
            let managed = matches!(&self.slots[idx], Slot::Occupied(s) if s.managed == ManagedState::Managed);
            if managed && !live.contains(&SeriesId(u32::try_from(idx).unwrap())) {
                self.slots[idx] = Slot::Free(self.free_head);
                self.free_head = Some(u32::try_from(idx).unwrap());
                self.tracker.release_allocation();
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut by_flavor = BTreeMap::new();
        let mut live = 0;
        let mut free = 0;
        for slot in &self.slots {
            match slot {
                Slot::Occupied(s) => {
                    live += 1;
                    let name = match s.data.flavor() {
                        crate::series::Flavor::Array => "array",
                        crate::series::Flavor::Strand => "strand",
                        crate::series::Flavor::Binary => "binary",
                        crate::series::Flavor::Context => "context",
                    };
                    *by_flavor.entry(name).or_insert(0) += 1;
                }
                Slot::Free(_) => free += 1,
            }
        }
        HeapStats {
            live_series: live,
            free_slots: free,
            total_slots: self.slots.len(),
            by_flavor,
        }
    }
}

impl std::fmt::Display for GuardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "guard#{}", self.0)
    }
}

/// Extracts the series this cell's payload references, if any, for GC
/// reachability walks. Word bindings to contexts are intentionally NOT
/// followed here: a word's binding keeps its target context alive only
/// through the context itself being reachable some other way (spec §3.3
/// bindings are references, not ownership).
fn series_ref(cell: &Cell) -> Option<SeriesId> {
    match cell.payload() {
        Payload::Series { id, .. } => Some(*id),
        Payload::Context(ctx) => Some(ctx.series_id()),
        // Actions live in the flat `ActionTable`, not this arena; nothing to
        // follow (see `action.rs`'s module doc).
        Payload::Action(_) => None,
        Payload::Quoted(inner) => series_ref(inner),
        Payload::Word {
            binding: Binding::Virtual(patch, _),
            ..
        } => Some(patch.series_id()),
        _ => None,
    }
}
