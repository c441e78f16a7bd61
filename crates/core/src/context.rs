//! Context, binding and virtual-binding (LET patch) machinery, spec §3.3.

use crate::action::ActionId;
use crate::cell::{Binding, Cell};
use crate::heap::Heap;
use crate::resource::ResourceTracker;
use crate::series::{Series, SeriesData, SeriesId, SidecarSlot};
use crate::symbol::Symbol;

/// Context variant, spec §3.3. `Frame` is intentionally absent: a running
/// activation's argument slots live in `frame::Frame` directly (see
/// DESIGN.md's note on eager reification), so only the three keyed-record
/// shapes that are genuinely heap objects need a `ContextId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Object,
    Module,
    Error,
}

/// Identifies a context: its varlist is a series in the arena; its keylist
/// is that series' `link` sidecar (spec §3.3: "keylist shared across
/// sibling contexts when possible").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContextId(SeriesId);

impl ContextId {
    #[must_use]
    pub(crate) fn series_id(self) -> SeriesId {
        self.0
    }
}

/// Identifies a LET patch: a singleton array prepending one binding onto an
/// existing chain, spec §3.3/§4.E.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LetPatchId(SeriesId);

impl LetPatchId {
    #[must_use]
    pub(crate) fn series_id(self) -> SeriesId {
        self.0
    }
}

/// The binding context an evaluator step threads through `derelativize`,
/// spec §3.3 GLOSSARY. See DESIGN.md: function bodies are bound eagerly to
/// an absolute `Context` at frame-push time, so `Relative` resolution is
/// only exercised for the documented "detached" fallback (spec §9).
#[derive(Debug, Clone, Default)]
pub enum Specifier {
    #[default]
    None,
    Context(ContextId),
}

impl Specifier {
    #[must_use]
    pub fn resolve_relative(&self, _action: ActionId) -> Option<ContextId> {
        match self {
            Self::Context(id) => Some(*id),
            Self::None => None,
        }
    }
}

/// Creates a new context with the given keylist (symbol list) and matching
/// initial values, spec §4.F `Make_Paramlist`-adjacent "pop into parallel
/// arrays" step, generalized to plain object/module/error contexts.
pub fn make_context<T: ResourceTracker>(
    heap: &mut Heap<T>,
    kind: ContextKind,
    entries: &[(Symbol, Cell)],
) -> Result<ContextId, crate::errors::FailError> {
    let mut keylist = Series::new_array(entries.len());
    keylist.data = SeriesData::Array(
        entries
            .iter()
            .map(|(sym, _)| Cell::init_word(crate::cell::Kind::Word, *sym, Binding::Unbound, false))
            .collect(),
    );
    let keylist_id = heap.alloc(keylist)?;
    heap.manage(keylist_id);

    let mut varlist = Series::new_array(entries.len());
    varlist.data = SeriesData::Array(entries.iter().map(|(_, cell)| cell.clone()).collect());
    varlist.link = SidecarSlot::Series(keylist_id);
    varlist.misc = SidecarSlot::Index(kind as u32);
    let varlist_id = heap.alloc(varlist)?;
    heap.manage(varlist_id);

    Ok(ContextId(varlist_id))
}

/// `Append_Context`: appends one new symbol/value slot to `ctx`'s keylist
/// and varlist, spec §4.F / §9 (resolves the nullptr-vs-0 Open Question by
/// taking `Option<Symbol>`: `None` means "no symbol supplied, just grow the
/// varlist slot", matching the nullptr sense from the source revisions).
pub fn append_context<T: ResourceTracker>(
    heap: &mut Heap<T>,
    ctx: ContextId,
    symbol: Option<Symbol>,
    value: Cell,
) -> Result<u32, crate::errors::FailError> {
    let keylist_id = match heap.get(ctx.0).link {
        SidecarSlot::Series(id) => id,
        _ => return Err(crate::errors::FailError::simple(crate::errors::ErrorId::NotBoundToContext, "context has no keylist")),
    };
    let index = heap.get(ctx.0).term_len() as u32;
    if let Some(sym) = symbol {
        heap.get_mut(keylist_id)?
            .push(Cell::init_word(crate::cell::Kind::Word, sym, Binding::Unbound, false));
    } else {
        heap.get_mut(keylist_id)?.push(Cell::init_blank(false));
    }
    heap.get_mut(ctx.0)?.push(value);
    Ok(index)
}

/// Looks up `symbol` in `ctx`'s keylist, spec §4.E. Returns the slot index.
#[must_use]
pub fn lookup_in_context<T: ResourceTracker>(heap: &Heap<T>, ctx: ContextId, symbol: Symbol) -> Option<u32> {
    let keylist_id = match heap.get(ctx.0).link {
        SidecarSlot::Series(id) => id,
        _ => return None,
    };
    heap.get(keylist_id).data.as_array().and_then(|keys| {
        keys.iter().position(|key| match key.payload() {
            crate::cell::Payload::Word { symbol: s, .. } => *s == symbol,
            _ => false,
        })
    }).map(|i| u32::try_from(i).expect("context too large"))
}

#[must_use]
pub fn get_var<T: ResourceTracker>(heap: &Heap<T>, ctx: ContextId, index: u32) -> Cell {
    heap.get(ctx.0)
        .at(index as usize)
        .cloned()
        .unwrap_or_else(Cell::init_null_const)
}

pub fn set_var<T: ResourceTracker>(
    heap: &mut Heap<T>,
    ctx: ContextId,
    index: u32,
    value: Cell,
) -> Result<(), crate::errors::FailError> {
    let series = heap.get_mut(ctx.0)?;
    if let Some(cells) = series.data.as_array_mut() {
        if let Some(slot) = cells.get_mut(index as usize) {
            slot.check_writable()?;
            *slot = value;
            return Ok(());
        }
    }
    Err(crate::errors::FailError::simple(
        crate::errors::ErrorId::NotBoundToContext,
        "slot index out of range",
    ))
}

/// `LET` patch creation: prepends one (symbol -> cell) binding onto the
/// front of a binding chain, spec §3.3/§4.E.
pub fn make_let_patch<T: ResourceTracker>(
    heap: &mut Heap<T>,
    symbol: Symbol,
    value: Cell,
) -> Result<LetPatchId, crate::errors::FailError> {
    let mut series = Series::new_array(1);
    series.data = SeriesData::Array(vec![value]);
    series.misc = SidecarSlot::Index(symbol.index() as u32);
    let id = heap.alloc(series)?;
    heap.manage(id);
    Ok(LetPatchId(id))
}

#[must_use]
pub fn let_patch_symbol<T: ResourceTracker>(heap: &Heap<T>, patch: LetPatchId) -> Option<Symbol> {
    match heap.get(patch.0).misc {
        SidecarSlot::Index(raw) => Some(Symbol::from_index(raw)),
        _ => None,
    }
}

#[must_use]
pub fn let_patch_value<T: ResourceTracker>(heap: &Heap<T>, patch: LetPatchId) -> Cell {
    heap.get(patch.0).at(0).cloned().unwrap_or_else(Cell::init_null_const)
}

impl Cell {
    fn init_null_const() -> Self {
        let mut c = Self::init_null(false);
        c.set_flag(crate::cell::CellFlags::PROTECTED);
        c
    }
}
