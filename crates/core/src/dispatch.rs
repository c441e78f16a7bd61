//! Per-kind dispatch surface: comparison, mold, generic actions, spec §4.J.
//!
//! Resolves the `GENERIC`-as-separate-native Open Question (spec §9) as a
//! single `(Kind, Symbol) -> generic fn` table rather than minting a
//! distinct native per verb; see DESIGN.md.

use ahash::AHashMap;

use crate::cell::{Cell, Kind};
use crate::errors::{ErrorId, FailError, RunResult};
use crate::frame::Frame;
use crate::resource::ResourceTracker;
use crate::runtime::Runtime;
use crate::symbol::Symbol;
use crate::tracer::EvalTracer;

/// Bit-packed accepted-kind set, spec §4.F "Accepted type set (bit-packed
/// per-kind)". `Kind` has under 64 variants so a `u64` covers it; pseudo-
/// types (quoted-N, refinement, endable) are represented as separate
/// `ParamTags` bits in `action.rs` rather than stolen bits here, since they
/// are per-parameter modifiers, not per-value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Typeset(u64);

impl Typeset {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn any() -> Self {
        Self(u64::MAX)
    }

    #[must_use]
    pub fn with(mut self, kind: Kind) -> Self {
        self.0 |= 1 << (kind as u64 % 64);
        self
    }

    #[must_use]
    pub fn contains(self, kind: Kind) -> bool {
        self.0 & (1 << (kind as u64 % 64)) != 0
    }
}

/// Three-way comparison result, spec §4.J "comparison (CT)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Less,
    Equal,
    Greater,
}

type CompareFn = fn(&Cell, &Cell, bool) -> Option<CompareResult>;
type MoldFn<T, Tr> = fn(&Cell, &Runtime<T, Tr>) -> String;
type GenericFn<T, Tr> = fn(&mut Frame, &mut Runtime<T, Tr>, Symbol) -> RunResult<Cell>;

/// The per-kind hook tables, spec §4.J. Populated at boot from
/// `natives::install_dispatch`.
pub struct DispatchTable<T: ResourceTracker, Tr: EvalTracer> {
    compare: AHashMap<Kind, CompareFn>,
    mold: AHashMap<Kind, MoldFn<T, Tr>>,
    generic: AHashMap<(Kind, Symbol), GenericFn<T, Tr>>,
}

impl<T: ResourceTracker, Tr: EvalTracer> Default for DispatchTable<T, Tr> {
    fn default() -> Self {
        Self {
            compare: AHashMap::default(),
            mold: AHashMap::default(),
            generic: AHashMap::default(),
        }
    }
}

impl<T: ResourceTracker, Tr: EvalTracer> DispatchTable<T, Tr> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_compare(&mut self, kind: Kind, f: CompareFn) {
        self.compare.insert(kind, f);
    }

    pub fn register_mold(&mut self, kind: Kind, f: MoldFn<T, Tr>) {
        self.mold.insert(kind, f);
    }

    pub fn register_generic(&mut self, kind: Kind, verb: Symbol, f: GenericFn<T, Tr>) {
        self.generic.insert((kind, verb), f);
    }

    /// Spec §4.J: "Unhooked kinds fail `cannot compare`."
    pub fn compare(&self, a: &Cell, b: &Cell, case_sensitive: bool) -> RunResult<CompareResult> {
        let hook = self
            .compare
            .get(&a.heart())
            .ok_or_else(|| FailError::simple(ErrorId::CannotCompare, format!("no CT hook for {}", a.heart())))?;
        hook(a, b, case_sensitive)
            .ok_or_else(|| FailError::simple(ErrorId::CannotCompare, format!("{a} and {b} are not comparable")).into())
    }

    #[must_use]
    pub fn mold(&self, cell: &Cell, rt: &Runtime<T, Tr>) -> String {
        self.mold
            .get(&cell.heart())
            .map_or_else(|| cell.to_string(), |hook| hook(cell, rt))
    }

    /// Spec §4.J: "Unhooked kinds fail `no dispatcher`."
    pub fn dispatch_generic(&self, frame: &mut Frame, rt: &mut Runtime<T, Tr>, kind: Kind, verb: Symbol) -> RunResult<Cell> {
        let hook = self
            .generic
            .get(&(kind, verb))
            .copied()
            .ok_or_else(|| FailError::simple(ErrorId::NoDispatcher, format!("no generic dispatcher for {kind}")))?;
        hook(frame, rt, verb)
    }
}
