//! Action model: paramlist, parameter classes, dispatcher, spec §3.4/§4.F.
//!
//! Actions are allocated once (at boot, or when `func`/`make action!` run)
//! into a flat `ActionTable` rather than the mark-swept series arena: unlike
//! objects, actions in this runtime are never individually collected (the
//! teacher similarly keeps `FunctionId`s in a flat, append-only `Interns`
//! table rather than the refcounted heap — see `intern.rs`'s `FunctionId`).

use smallvec::SmallVec;

use crate::cell::Cell;
use crate::context::Specifier;
use crate::errors::RunResult;
use crate::series::SeriesId;
use crate::symbol::Symbol;

/// Unique identifier for an action, spec §3.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ActionId(u32);

impl ActionId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Actions are not series-arena citizens; present for symmetry with
    /// `ContextId`/`LetPatchId` call sites in the GC mark walk, where it is
    /// simply not followed (see `heap::series_ref`).
    #[must_use]
    pub fn series_id(self) -> SeriesId {
        crate::errors::panic_core("ActionId has no backing series; this call site is a bug")
    }
}

/// Parameter classes, spec §4.F (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    Normal,
    Hard,
    Soft,
    Medium,
    Modal,
    Return,
    Output,
    Local,
}

/// Per-parameter tags, spec §4.F. Hand-rolled bitset (matching the style of
/// `cell::CellFlags`) rather than pulling in a flags-macro crate the teacher
/// never depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamTags(u16);

impl ParamTags {
    pub const REFINEMENT: Self = Self(1 << 0);
    pub const ENDABLE: Self = Self(1 << 1);
    pub const SKIPPABLE: Self = Self(1 << 2);
    pub const DEQUOTE_REQUOTE: Self = Self(1 << 3);
    pub const CONST: Self = Self(1 << 4);
    pub const NOOP_IF_BLANK: Self = Self(1 << 5);
    pub const INVISIBLE: Self = Self(1 << 6);
    pub const VARIADIC: Self = Self(1 << 7);
    /// This parameter is the trailing argument "picked up" for the refinement
    /// declared immediately before it, spec §4.H.3 REFINEMENT row's "pickup"
    /// pass: fulfilled from the feed only when that refinement was requested,
    /// else left null without consuming anything.
    pub const REFINEMENT_ARG: Self = Self(1 << 8);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ParamTags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One parameter's full description, spec §3.4/§4.F.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub symbol: Symbol,
    pub class: ParamClass,
    pub tags: ParamTags,
    /// Bit-packed accepted-kind set; see `dispatch::Typeset`.
    pub type_set: u64,
    /// Pre-supplied value for a specialized (exemplar) argument.
    pub specialized: Option<Cell>,
}

impl ParamSpec {
    #[must_use]
    pub fn new(symbol: Symbol, class: ParamClass) -> Self {
        Self {
            symbol,
            class,
            tags: ParamTags::default(),
            type_set: u64::MAX,
            specialized: None,
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: ParamTags) -> Self {
        self.tags = tags;
        self
    }
}

/// Action flags, spec §3.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionFlags(u16);

impl ActionFlags {
    pub const ENFIXED: Self = Self(1 << 0);
    pub const QUOTES_FIRST: Self = Self(1 << 1);
    pub const DEFERS_LOOKBACK: Self = Self(1 << 2);
    pub const POSTPONES_ENTIRELY: Self = Self(1 << 3);
    pub const SKIPPABLE_FIRST: Self = Self(1 << 4);
    pub const IS_INVISIBLE: Self = Self(1 << 5);
    pub const IS_NATIVE: Self = Self(1 << 6);
    pub const RETURN_REQUOTES: Self = Self(1 << 7);
    pub const HAS_RETURN: Self = Self(1 << 8);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ActionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// What a `dispatch` call invokes, spec §3.4 "Dispatcher". Generic over the
/// same `(T, Tr)` pair as `Runtime`, the way the teacher's VM generics
/// (`Tr: VmTracer`) thread through its own call/dispatch machinery.
pub enum Dispatcher<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> {
    /// A native Rust function; `natives::*` populates these at boot.
    Native(NativeFn<T, Tr>),
    /// An interpreted (user-defined `func`/`does`) body: an array of cells
    /// plus the specifier the body's relative bindings resolve against.
    Interpreted { body: SeriesId },
}

/// Native dispatch signature: given the running frame, produce a result (or
/// a thrown/failed outcome via `RunResult`+frame's throw-state side channel,
/// spec §4.H.3/§4.I).
pub type NativeFn<T, Tr> = fn(&mut crate::frame::Frame, &mut crate::runtime::Runtime<T, Tr>) -> RunResult<Cell>;

/// An invocable action value, spec §3.4.
pub struct Action<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> {
    pub name: Symbol,
    pub params: SmallVec<[ParamSpec; 4]>,
    pub dispatcher: Dispatcher<T, Tr>,
    pub flags: ActionFlags,
    pub meta: Option<String>,
    /// The specifier relative-bound words in an interpreted body resolve
    /// against when no live frame supplies a tighter one.
    pub definition_specifier: Specifier,
}

impl<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> Action<T, Tr> {
    #[must_use]
    pub fn param_index(&self, symbol: Symbol) -> Option<usize> {
        self.params.iter().position(|p| p.symbol == symbol)
    }
}

/// Append-only store of every action created for the lifetime of a
/// `Runtime`, spec §9 ("confine to one Runtime object").
pub struct ActionTable<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> {
    actions: Vec<Action<T, Tr>>,
}

impl<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> Default for ActionTable<T, Tr> {
    fn default() -> Self {
        Self { actions: Vec::new() }
    }
}

impl<T: crate::resource::ResourceTracker, Tr: crate::tracer::EvalTracer> ActionTable<T, Tr> {
    pub fn insert(&mut self, action: Action<T, Tr>) -> ActionId {
        let id = ActionId(u32::try_from(self.actions.len()).expect("action table overflow"));
        self.actions.push(action);
        id
    }

    #[must_use]
    pub fn get(&self, id: ActionId) -> &Action<T, Tr> {
        &self.actions[id.index()]
    }

    pub fn get_mut(&mut self, id: ActionId) -> &mut Action<T, Tr> {
        &mut self.actions[id.index()]
    }
}
