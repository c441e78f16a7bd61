//! Word -> slot resolution, bind-deep/unbind-deep, LET patches, spec §4.E.
//!
//! Grounded on the teacher's `NamespaceId`-based variable lookup
//! (`namespace.rs`): a word resolves by walking an explicit chain rather
//! than by pointer-chasing a linked scope object, the same shape as this
//! module's virtual-binding chain walk.

use crate::cell::{Binding, Cell, Kind, Payload};
use crate::context::{self, ContextId, Specifier};
use crate::errors::{ErrorId, FailError, RunResult};
use crate::heap::Heap;
use crate::resource::ResourceTracker;
use crate::series::SeriesId;
use crate::symbol::Symbol;

/// Resolves a bound word cell to its current value, spec §4.E / §3.3. Walks
/// virtual-binding (`LET`) patches first, then falls back to the anchor
/// context, matching spec §4.E: "a word lookup walks the chain patches
/// first, then falls back to the anchor context(s)."
pub fn lookup_word<T: ResourceTracker>(heap: &Heap<T>, symbol: Symbol, binding: &Binding) -> RunResult<Cell> {
    match binding {
        Binding::Virtual(patch, rest) => {
            if context::let_patch_symbol(heap, *patch) == Some(symbol) {
                Ok(context::let_patch_value(heap, *patch))
            } else {
                lookup_word(heap, symbol, rest)
            }
        }
        Binding::Context(ctx) => {
            let index = context::lookup_in_context(heap, *ctx, symbol)
                .ok_or_else(|| not_bound(symbol))?;
            Ok(context::get_var(heap, *ctx, index))
        }
        Binding::Relative(_) | Binding::Unbound => Err(not_bound(symbol).into()),
    }
}

/// Assigns into a bound word's slot, spec §4.H.1 `SET_WORD` ("assign
/// variable"). Mirrors `lookup_word`'s walk.
pub fn set_word<T: ResourceTracker>(
    heap: &mut Heap<T>,
    symbol: Symbol,
    binding: &Binding,
    value: Cell,
) -> RunResult<()> {
    match binding {
        Binding::Virtual(patch, rest) => {
            if context::let_patch_symbol(heap, *patch) == Some(symbol) {
                let series = heap.get_mut(patch.series_id())?;
                if let Some(cells) = series.data.as_array_mut() {
                    if let Some(slot) = cells.first_mut() {
                        *slot = value;
                        return Ok(());
                    }
                }
                Err(not_bound(symbol).into())
            } else {
                set_word(heap, symbol, rest, value)
            }
        }
        Binding::Context(ctx) => {
            let index = context::lookup_in_context(heap, *ctx, symbol).ok_or_else(|| not_bound(symbol))?;
            context::set_var(heap, *ctx, index, value).map_err(Into::into)
        }
        Binding::Relative(_) | Binding::Unbound => Err(not_bound(symbol).into()),
    }
}

fn not_bound(symbol: Symbol) -> FailError {
    FailError::simple(ErrorId::NotBoundToContext, format!("{symbol} is not bound to a context"))
}

/// `Bind_Values_Deep`, spec §4.E: walks an array of cells, binding every
/// word of kind in `target_kinds` to `ctx` by symbol. Mid-stream binding
/// (appending unknown words) is not performed here; unmatched words are
/// left as-is (the caller may retry after `append_context`), matching spec
/// §4.E's "on miss, optionally append... or leave unbound."
pub fn bind_deep<T: ResourceTracker>(heap: &Heap<T>, cells: &mut [Cell], ctx: ContextId) {
    for cell in cells.iter_mut() {
        if let Payload::Word { symbol, binding, cached_index } = cell.payload_mut() {
            if let Some(index) = context::lookup_in_context(heap, ctx, *symbol) {
                *binding = Binding::Context(ctx);
                *cached_index = Some(index);
            }
        }
    }
}

/// Binds every word cell reachable from `array` — including nested `BLOCK!`/
/// `GROUP!` sub-arrays, spec §4.E "Bind deep: walk a tree of cells" — against
/// `ctx`, appending on miss, spec §4.E "on miss, optionally append." Used by
/// the top-level `evaluate()` entry point (spec §6) to bind freshly scanned
/// source against the running session's context before the first evaluator
/// step sees it — plain scanned words start out `Unbound` (spec §4.D), and
/// nothing else in this runtime mutates that for top-level code.
///
/// `fallback`, if given, is consulted (spec §4.E "the anchor context(s)",
/// plural) before a miss in `ctx` grows `ctx` itself: this is how natives
/// installed into the boot `system` module (`if`, `func`, `catch`, the
/// arithmetic ops, ...) resolve from user code bound only to a fresh, empty
/// top-level context, rather than every one of them silently becoming a new
/// null variable the first time a script mentions it.
pub fn bind_deep_declarative<T: ResourceTracker>(
    heap: &mut Heap<T>,
    array: SeriesId,
    ctx: ContextId,
    fallback: Option<ContextId>,
) -> Result<(), FailError> {
    let len = heap.get(array).term_len();
    for i in 0..len {
        let cell = match heap.get(array).at(i) {
            Some(c) => c.clone(),
            None => continue,
        };
        match cell.payload() {
            Payload::Word { symbol, binding: Binding::Unbound, .. } => {
                let symbol = *symbol;
                let (target_ctx, index) = resolve_or_declare(heap, ctx, fallback, symbol)?;
                if let Some(Payload::Word { binding, cached_index, .. }) =
                    heap.get_mut(array)?.data.as_array_mut().and_then(|c| c.get_mut(i)).map(Cell::payload_mut)
                {
                    *binding = Binding::Context(target_ctx);
                    *cached_index = Some(index);
                }
            }
            Payload::Series { id, .. } if matches!(cell.kind(), Kind::Block | Kind::Group) => {
                let nested = *id;
                bind_deep_declarative(heap, nested, ctx, fallback)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Resolves `symbol` against `ctx`, then `fallback` (spec §4.E "the anchor
/// context(s)"), declaring a fresh null slot in `ctx` only when neither has
/// it — the append-on-miss half of spec §4.E's bind contract.
fn resolve_or_declare<T: ResourceTracker>(
    heap: &mut Heap<T>,
    ctx: ContextId,
    fallback: Option<ContextId>,
    symbol: Symbol,
) -> Result<(ContextId, u32), FailError> {
    if let Some(index) = context::lookup_in_context(heap, ctx, symbol) {
        return Ok((ctx, index));
    }
    if let Some(fallback_ctx) = fallback {
        if let Some(index) = context::lookup_in_context(heap, fallback_ctx, symbol) {
            return Ok((fallback_ctx, index));
        }
    }
    let index = context::append_context(heap, ctx, Some(symbol), Cell::init_null(false))?;
    Ok((ctx, index))
}

/// `Unbind_Values_Deep`, spec §4.E inverse: clears bindings, optionally only
/// those pointing at `only`.
pub fn unbind_deep(cells: &mut [Cell], only: Option<ContextId>) {
    for cell in cells.iter_mut() {
        if let Payload::Word { binding, .. } = cell.payload_mut() {
            let should_clear = match (&binding, only) {
                (Binding::Context(ctx), Some(target)) => *ctx == target,
                (Binding::Context(_), None) => true,
                _ => false,
            };
            if should_clear {
                *binding = Binding::Unbound;
            }
        }
    }
}

/// Wraps `binding` with a fresh LET patch for `symbol`, spec §4.E "LET
/// patch: a 1-entry patch linked to the front of the current feed's binding
/// chain."
pub fn make_let_binding<T: ResourceTracker>(
    heap: &mut Heap<T>,
    symbol: Symbol,
    value: Cell,
    outer: Binding,
) -> Result<Binding, FailError> {
    let patch = context::make_let_patch(heap, symbol, value)?;
    Ok(Binding::Virtual(patch, Box::new(outer)))
}

/// Builds the specifier a nested evaluation should use for `feed`'s
/// binding, spec §4.G/§4.E: currently the frame's own specifier, since LET
/// patches are carried on individual word cells' bindings rather than on
/// the feed itself in this implementation (see DESIGN.md).
#[must_use]
pub fn inherit_specifier(outer: &Specifier) -> Specifier {
    outer.clone()
}
