//! The evaluator core step machine, spec §4.H.
//!
//! Grounded on the teacher's bytecode dispatch loop (`bytecode/vm/mod.rs`'s
//! `run` method): a tight `match` over the current instruction driving a
//! `CallFrame` stack, generalized here from a flat opcode tape to a
//! one-cell-lookahead `Feed` over nested cell arrays, with enfix lookahead
//! layered on top of the same dispatch primitive used for prefix calls.

use smallvec::SmallVec;

use crate::action::{ActionFlags, ActionId, Dispatcher, ParamClass, ParamSpec};
use crate::binder;
use crate::cell::{Binding, Cell, CellFlags, Kind, Payload};
use crate::context::{self, ContextKind, Specifier};
use crate::errors::{ErrorId, FailError, RunResult};
use crate::feed::{Feed, FeedFlags};
use crate::frame::Frame;
use crate::fulfill;
use crate::resource::ResourceTracker;
use crate::runtime::Runtime;
use crate::symbol::Symbol;
use crate::tracer::EvalTracer;

/// Outcome of one conceptual evaluator step, spec §4.H.2 "Invisibles... do
/// not overwrite OUT... the evaluator then re-triggers on the next token."
enum StepResult {
    Value(Cell),
    Invisible,
}

/// Runs a single evaluator step (spec §4.H.3's "run a nested evaluator step
/// into the arg slot") with NO trailing enfix lookahead of its own — the
/// caller (either `eval_full_expression`'s own lookahead, or whichever
/// enfix action's argument fulfillment this is) decides whether to chain
/// into a following infix op. This is exactly what makes left-to-right,
/// no-precedence chaining fall out correctly (spec §8 `1 + 2 * 3 = 9`):
/// fulfilling `+`'s right argument must stop at the bare `2`, leaving `* 3`
/// for the *outer* expression loop to pick up.
pub fn eval_into_value<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed) -> RunResult<Cell> {
    loop {
        match eval_one_step(rt, feed)? {
            StepResult::Value(v) => return Ok(v),
            StepResult::Invisible => {
                if rt.thrown.is_some() {
                    return Ok(Cell::init_void());
                }
                continue;
            }
        }
    }
}

/// Runs a full expression: one value-producing step, invisibles skipped,
/// followed by the post-switch enfix lookahead/chain loop, spec §4.H.1's
/// `post-switch` bullet. This is what a block-evaluation loop (`do`) or a
/// `GROUP!`/interpreted-body evaluation calls once per logical expression.
pub fn eval_full_expression<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed) -> RunResult<Cell> {
    let mut out = eval_into_value(rt, feed)?;
    if rt.thrown.is_some() {
        return Ok(out);
    }
    loop {
        if feed.flags().contains(FeedFlags::NO_LOOKAHEAD) {
            feed.clear_flag(FeedFlags::NO_LOOKAHEAD);
            break;
        }
        let Some(peeked) = feed.peek().cloned() else { break };
        let Some((action_id, symbol)) = resolve_enfixed_word(rt, &peeked) else { break };
        // DEFERS_LOOKBACK / POSTPONES_ENTIRELY (spec §4.H.2) are only
        // meaningful when this expression is itself nested inside an
        // enclosing argument fulfillment; this top-level driver does not
        // track that enclosing context, so both run immediately here. See
        // DESIGN.md.
        feed.consume(&rt.heap);
        out = dispatch_action(rt, feed, action_id, Some(symbol), Some(out))?;
        if rt.thrown.is_some() {
            return Ok(out);
        }
    }
    Ok(out)
}

/// Evaluates `array` to completion under `specifier`, spec §4.H "`do` a
/// block", used for `GROUP!` bodies, interpreted action bodies, and the
/// top-level `evaluate()` entry point. An empty or fully-invisible block
/// evaluates to void.
pub fn eval_block_to_end<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    array: crate::series::SeriesId,
    specifier: Specifier,
) -> RunResult<Cell> {
    let mut feed = Feed::new(&rt.heap, array, specifier.clone());
    rt.calls.push(Frame::for_block(feed.clone(), specifier));
    let mut out = Cell::init_void();
    while !feed.is_at_end() {
        out = eval_full_expression(rt, &mut feed)?;
        if rt.thrown.is_some() {
            break;
        }
    }
    rt.calls.pop();
    Ok(out)
}

fn eval_one_step<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed) -> RunResult<StepResult> {
    if let Some(second) = peek_second(rt, feed) {
        if let Some((action_id, symbol)) = resolve_enfixed_word(rt, &second) {
            let action = rt.actions.get(action_id);
            if action.flags.contains(ActionFlags::QUOTES_FIRST) {
                let Some(stolen) = feed.consume(&rt.heap) else {
                    return Err(FailError::simple(ErrorId::EvaluateNull, "nothing to steal for left-quoting enfix").into());
                };
                feed.consume(&rt.heap);
                return Ok(StepResult::Value(dispatch_action(rt, feed, action_id, Some(symbol), Some(stolen))?));
            }
        }
    }

    let Some(cell) = feed.consume(&rt.heap) else {
        return Err(FailError::simple(ErrorId::EvaluateNull, "evaluation ran past the end of the feed").into());
    };
    step_from_cell(rt, feed, cell)
}

/// Reads the cell one past the feed's current lookahead without consuming
/// anything, for the pre-lookahead left-quoting-steal check (spec §4.H.1),
/// which needs to see *two* cells ahead while `Feed` itself only commits to
/// one (spec §4.G).
fn peek_second<T: ResourceTracker, Tr: EvalTracer>(rt: &Runtime<T, Tr>, feed: &Feed) -> Option<Cell> {
    rt.heap
        .get(feed.array())
        .at(feed.index() as usize + 1)
        .map(|c| c.derelativize(feed.specifier()))
}

fn resolve_enfixed_word<T: ResourceTracker, Tr: EvalTracer>(rt: &Runtime<T, Tr>, cell: &Cell) -> Option<(ActionId, Symbol)> {
    let Payload::Word { symbol, binding, .. } = cell.payload() else {
        return None;
    };
    if !matches!(cell.kind(), Kind::Word) {
        return None;
    }
    let value = binder::lookup_word(&rt.heap, *symbol, binding).ok()?;
    let Payload::Action(action_id) = value.payload() else {
        return None;
    };
    if rt.actions.get(*action_id).flags.contains(ActionFlags::ENFIXED) {
        Some((*action_id, *symbol))
    } else {
        None
    }
}

fn step_from_cell<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: Cell) -> RunResult<StepResult> {
    if cell.quote_depth() > 0 || cell.kind() == Kind::Quoted {
        return Ok(StepResult::Value(
            cell.dequotify().expect("quote_depth > 0 or Quoted kind always dequotifies"),
        ));
    }

    match cell.kind() {
        Kind::Null | Kind::Void => Err(FailError::simple(ErrorId::VoidEvaluation, "evaluator may not see NULL/VOID directly").into()),
        // Literal "the"-forms (`@word`, `@path`, ...) never evaluate, spec
        // §4.D word_like_cell note; the scanner's sigil table is the only
        // other place this distinction matters.
        Kind::SymWord | Kind::SymPath | Kind::SymTuple | Kind::SymBlock | Kind::SymGroup => {
            let mut out = cell;
            out.set_flag(CellFlags::UNEVALUATED);
            Ok(StepResult::Value(out))
        }
        Kind::Word => eval_word(rt, feed, &cell),
        Kind::GetWord => eval_get_word(rt, &cell),
        Kind::SetWord => eval_set_word(rt, feed, &cell),
        Kind::Group => eval_group(rt, &cell),
        Kind::GetGroup | Kind::SetGroup => eval_get_set_group(rt, feed, &cell),
        Kind::Path | Kind::GetPath => eval_path(rt, feed, &cell),
        Kind::SetPath => eval_set_path(rt, feed, &cell),
        Kind::SetBlock => eval_set_block(rt, feed, &cell),
        Kind::Action => {
            let Payload::Action(action_id) = *cell.payload() else {
                unreachable!("ACTION kind always carries Payload::Action")
            };
            let value = dispatch_action(rt, feed, action_id, None, None)?;
            Ok(as_step_result(rt, action_id, value))
        }
        _ => {
            let mut out = cell;
            out.set_flag(CellFlags::UNEVALUATED);
            Ok(StepResult::Value(out))
        }
    }
}

fn eval_word<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Word { symbol, binding, .. } = cell.payload() else {
        unreachable!("WORD kind always carries Payload::Word")
    };
    let value = binder::lookup_word(&rt.heap, *symbol, binding)?;
    if let Payload::Action(action_id) = value.payload() {
        let action_id = *action_id;
        let result = dispatch_action(rt, feed, action_id, Some(*symbol), None)?;
        return Ok(as_step_result(rt, action_id, result));
    }
    Ok(StepResult::Value(value))
}

/// Spec §4.H.2: an `IS_INVISIBLE` action's result never overwrites `OUT`; the
/// evaluator re-triggers on the next token as if this step produced nothing.
fn as_step_result<T: ResourceTracker, Tr: EvalTracer>(rt: &Runtime<T, Tr>, action_id: ActionId, value: Cell) -> StepResult {
    if rt.actions.get(action_id).flags.contains(ActionFlags::IS_INVISIBLE) {
        StepResult::Invisible
    } else {
        StepResult::Value(value)
    }
}

fn eval_get_word<T: ResourceTracker, Tr: EvalTracer>(rt: &Runtime<T, Tr>, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Word { symbol, binding, .. } = cell.payload() else {
        unreachable!("GET_WORD kind always carries Payload::Word")
    };
    let value = binder::lookup_word(&rt.heap, *symbol, binding)?;
    if value.kind() == Kind::Void {
        return Err(FailError::simple(ErrorId::NeedNonVoid, format!("{symbol} is void")).into());
    }
    Ok(StepResult::Value(value))
}

fn eval_set_word<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Word { symbol, binding, .. } = cell.payload().clone() else {
        unreachable!("SET_WORD kind always carries Payload::Word")
    };
    let value = eval_into_value(rt, feed)?;
    if rt.thrown.is_some() {
        return Ok(StepResult::Value(value));
    }
    binder::set_word(&mut rt.heap, symbol, &binding, value.copy_cell())?;
    Ok(StepResult::Value(value))
}

fn eval_group<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Series { id, .. } = *cell.payload() else {
        unreachable!("GROUP kind always carries Payload::Series")
    };
    let specifier = Specifier::Context(match infer_owning_context(rt, cell) {
        Some(ctx) => ctx,
        None => return Ok(StepResult::Value(eval_block_to_end(rt, id, Specifier::None)?)),
    });
    Ok(StepResult::Value(eval_block_to_end(rt, id, specifier)?))
}

/// A GROUP!'s own cell binding (if its head word-bearing segment had one) is
/// not tracked separately from the array it wraps in this model; nested
/// relative bindings inside the group resolve against whatever specifier the
/// *enclosing* feed already carries, since `feed.consume` derelativized this
/// cell using that same specifier before we ever saw it. We recover it by
/// asking the already-resolved binding off the group's own (now-absolute)
/// payload, which at this representation has none to give — so we fall back
/// to "no narrower specifier than global", documented as a simplification
/// in DESIGN.md (bodies needing relative-word resolution inside bare GROUP!s
/// get it from being scanned/bound under a context already, not from this
/// fallback path).
fn infer_owning_context<T: ResourceTracker, Tr: EvalTracer>(_rt: &Runtime<T, Tr>, _cell: &Cell) -> Option<crate::context::ContextId> {
    None
}

fn eval_get_set_group<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Series { id, .. } = *cell.payload() else {
        unreachable!("GET_GROUP/SET_GROUP always carry Payload::Series")
    };
    let target = eval_block_to_end(rt, id, feed.specifier().clone())?;
    let Payload::Word { symbol, binding, .. } = target.payload().clone() else {
        return Err(FailError::simple(ErrorId::NotBoundToContext, "GET-GROUP!/SET-GROUP! must evaluate to a WORD!").into());
    };
    if cell.kind() == Kind::SetGroup {
        let value = eval_into_value(rt, feed)?;
        binder::set_word(&mut rt.heap, symbol, &binding, value.copy_cell())?;
        Ok(StepResult::Value(value))
    } else {
        let value = binder::lookup_word(&rt.heap, symbol, &binding)?;
        Ok(StepResult::Value(value))
    }
}

/// Resolves a (simplified) PATH!: the head segment is looked up as a word;
/// remaining WORD segments either pick a field out of a context or, if the
/// head resolved to an ACTION!, are pushed as requested refinements (spec
/// §4.H.3's "scan the pushed-refinement stack"). Index/integer picks and
/// generic-dispatch-backed picks on non-context series are not implemented;
/// see DESIGN.md.
fn eval_path<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Series { id, .. } = *cell.payload() else {
        unreachable!("PATH/GET_PATH kind always carries Payload::Series")
    };
    let specifier = feed.specifier().clone();
    let segments: Vec<Cell> = rt
        .heap
        .get(id)
        .data
        .as_array()
        .unwrap_or(&[])
        .iter()
        .map(|c| c.derelativize(&specifier))
        .collect();
    let Some(head) = segments.first() else {
        return Ok(StepResult::Value(Cell::init_blank(false)));
    };
    if !matches!(head.payload(), Payload::Word { .. }) {
        let mut out = cell.clone();
        out.set_flag(CellFlags::UNEVALUATED);
        return Ok(StepResult::Value(out));
    }
    let Payload::Word { symbol, binding, .. } = head.payload() else {
        unreachable!()
    };
    let mut current = binder::lookup_word(&rt.heap, *symbol, binding)?;
    let mut refinements: SmallVec<[Symbol; 4]> = SmallVec::new();

    for segment in &segments[1..] {
        match segment.payload() {
            Payload::Word { symbol: field, .. } if matches!(current.payload(), Payload::Action(_)) => {
                refinements.push(*field);
            }
            Payload::Word { symbol: field, .. } => {
                let Payload::Context(ctx) = current.payload() else {
                    return Err(FailError::simple(ErrorId::NoValue, "path pick on a non-context value is not supported").into());
                };
                let index = context::lookup_in_context(&rt.heap, *ctx, *field)
                    .ok_or_else(|| FailError::simple(ErrorId::NotBoundToContext, format!("{field} is not a field of this object")))?;
                current = context::get_var(&rt.heap, *ctx, index);
            }
            _ => return Err(FailError::simple(ErrorId::NoValue, "only WORD! path segments are supported").into()),
        }
    }

    if let Payload::Action(action_id) = current.payload() {
        let action_id = *action_id;
        // Pushed refinement words live only for the duration of this one
        // dispatch, spec §4.H.3 "scan the pushed-refinement stack for a
        // match" — drained back to `mark` so a later, unrelated call never
        // sees a stale "used" refinement from this path.
        let mark = rt.data_stack.mark();
        for r in refinements {
            fulfill::push_refinement_word(rt, r);
        }
        let result = dispatch_action(rt, feed, action_id, Some(*symbol), None);
        rt.data_stack.drain_from(mark);
        Ok(StepResult::Value(result?))
    } else {
        Ok(StepResult::Value(current))
    }
}

/// `obj/field: value`, spec §4.H.1 `SET_PATH`. Only a two-segment
/// context-field target is supported; see `eval_path`'s note.
fn eval_set_path<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Series { id, .. } = *cell.payload() else {
        unreachable!("SET_PATH kind always carries Payload::Series")
    };
    let specifier = feed.specifier().clone();
    let segments: Vec<Cell> = rt
        .heap
        .get(id)
        .data
        .as_array()
        .unwrap_or(&[])
        .iter()
        .map(|c| c.derelativize(&specifier))
        .collect();
    let value = eval_into_value(rt, feed)?;
    if rt.thrown.is_some() || segments.len() < 2 {
        return Ok(StepResult::Value(value));
    }
    let (Payload::Word { symbol: head_sym, binding: head_binding, .. }, Payload::Word { symbol: field, .. }) =
        (segments[0].payload(), segments[1].payload())
    else {
        return Err(FailError::simple(ErrorId::NoValue, "SET-PATH! requires WORD! segments").into());
    };
    let target = binder::lookup_word(&rt.heap, *head_sym, head_binding)?;
    let Payload::Context(ctx) = target.payload() else {
        return Err(FailError::simple(ErrorId::NoValue, "path-set on a non-context value is not supported").into());
    };
    let index = context::lookup_in_context(&rt.heap, *ctx, *field)
        .ok_or_else(|| FailError::simple(ErrorId::NotBoundToContext, format!("{field} is not a field of this object")))?;
    context::set_var(&mut rt.heap, *ctx, index, value.copy_cell())?;
    Ok(StepResult::Value(value))
}

/// `[a b]: action-call`, spec §4.H.1 `SET_BLOCK` / §9 Open Question (the
/// source's own multi-return path is flagged as "a slow prototype"; this is
/// a from-scratch, deliberately reduced reimplementation): the first target
/// receives the dispatch's full result, any further targets are set to
/// null. True per-slot `OUTPUT`-class wiring is not implemented; see
/// DESIGN.md.
fn eval_set_block<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, feed: &mut Feed, cell: &Cell) -> RunResult<StepResult> {
    let Payload::Series { id, .. } = *cell.payload() else {
        unreachable!("SET_BLOCK kind always carries Payload::Series")
    };
    let specifier = feed.specifier().clone();
    let targets: Vec<Cell> = rt
        .heap
        .get(id)
        .data
        .as_array()
        .unwrap_or(&[])
        .iter()
        .map(|c| c.derelativize(&specifier))
        .collect();
    let value = eval_into_value(rt, feed)?;
    if rt.thrown.is_some() {
        return Ok(StepResult::Value(value));
    }
    for (i, target) in targets.iter().enumerate() {
        if let Payload::Word { symbol, binding, .. } = target.payload() {
            let slot_value = if i == 0 { value.copy_cell() } else { Cell::init_null(false) };
            binder::set_word(&mut rt.heap, *symbol, binding, slot_value)?;
        }
    }
    Ok(StepResult::Value(value))
}

/// Invokes `action`, fulfilling its parameters from `feed` (spec §4.F/§4.H.3),
/// running its dispatcher, and resolving a matching definitional-return
/// throw (spec §4.H.4) before returning to the caller.
pub fn dispatch_action<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    feed: &mut Feed,
    action: ActionId,
    label: Option<Symbol>,
    arg_from_out: Option<Cell>,
) -> RunResult<Cell> {
    let dispatch_name = label.map_or_else(|| "<anonymous>".to_owned(), |s| rt.symbols.spelling(s).to_owned());
    rt.tracer.on_dispatch(&dispatch_name, rt.actions.get(action).flags.contains(ActionFlags::ENFIXED));

    // Spec §9's `Guess_If_Stack_Grows_Up` replacement: an explicit call-depth
    // bound checked against the call stack's own depth rather than comparing
    // raw stack pointers.
    rt.heap
        .tracker()
        .check_call_depth(rt.calls.depth())
        .map_err(|e| FailError::from_resource(&e))?;

    let param_count = rt.actions.get(action).params.len();
    let entries: Vec<(Symbol, Cell)> = rt
        .actions
        .get(action)
        .params
        .iter()
        .map(|p| (p.symbol, Cell::init_null(false)))
        .collect();
    let varlist = context::make_context(&mut rt.heap, ContextKind::Object, &entries)?;

    let fulfilled = fulfill::fulfill_args(rt, feed, action, arg_from_out, varlist)?;
    debug_assert_eq!(fulfilled.args.len(), param_count);
    for (i, arg) in fulfilled.args.iter().enumerate() {
        context::set_var(&mut rt.heap, varlist, u32::try_from(i).expect("param count fits u32"), arg.copy_cell())?;
    }

    let callee_feed = Feed::new(&rt.heap, feed.array(), Specifier::Context(varlist));
    let mut callee_frame = Frame::for_action(callee_feed, action, label, fulfilled.args, Some(varlist), Specifier::Context(varlist));
    rt.calls.push(callee_frame.clone());

    enum Body<T: ResourceTracker, Tr: EvalTracer> {
        Native(crate::action::NativeFn<T, Tr>),
        Interpreted(crate::series::SeriesId),
    }
    let body = match &rt.actions.get(action).dispatcher {
        Dispatcher::Native(f) => Body::Native(*f),
        Dispatcher::Interpreted { body } => Body::Interpreted(*body),
    };

    let result = match body {
        Body::Native(f) => f(&mut callee_frame, rt),
        Body::Interpreted(body) => eval_block_to_end(rt, body, Specifier::Context(varlist)),
    };

    rt.calls.pop();

    let value = result?;
    if let Some(thrown) = &rt.thrown {
        if thrown.matches_varlist(varlist) {
            let caught = rt.take_thrown().expect("just checked Some");
            return Ok(caught.value);
        }
    }
    Ok(value)
}

/// Mints a fresh `RETURN` native bound to `varlist`, spec §4.H.4: "its slot
/// is set to a RETURN native whose binding is this frame's varlist." Each
/// call to a `HAS_RETURN` action mints a new `ActionTable` entry carrying
/// its owner's varlist in `definition_specifier`; see DESIGN.md for why this
/// trades a small amount of append-only table growth for not needing a
/// lighter "bound native pointer" representation.
pub fn make_return_action<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, varlist: crate::context::ContextId) -> ActionId {
    let name = rt.symbols.intern("return");
    let value_param = rt.symbols.intern("value");
    rt.actions.insert(crate::action::Action {
        name,
        params: SmallVec::from_iter([ParamSpec::new(value_param, ParamClass::Normal)]),
        dispatcher: Dispatcher::Native(native_return::<T, Tr>),
        flags: crate::action::ActionFlags::empty(),
        meta: None,
        definition_specifier: Specifier::Context(varlist),
    })
}

fn native_return<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let phase = frame.phase.expect("native_return always runs inside its own minted frame");
    let Specifier::Context(owner) = rt.actions.get(phase).definition_specifier else {
        return Err(crate::errors::EvalError::internal("RETURN action minted without an owning varlist"));
    };
    let value = frame.args.first().cloned().unwrap_or_else(|| Cell::init_null(false));
    let label = Cell::init_context(Kind::Frame, owner);
    rt.throw_value(label, value);
    Ok(Cell::init_null(false))
}

/// Reserves (but does not yet bind) the `RETURN`/`OUTPUT` parameter slot
/// during fulfillment, invoked from `fulfill::fulfill_one` once the
/// callee's varlist id is known. Keeping this as a thin wrapper around
/// `make_return_action` lets `fulfill.rs` stay ignorant of the evaluator's
/// action-minting details.
pub fn bind_return_slot<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, varlist: crate::context::ContextId) -> Cell {
    let action_id = make_return_action(rt, varlist);
    Cell::init_action(action_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;
    use crate::tracer::NoopTracer;

    fn rt() -> Runtime<NoLimitTracker, NoopTracer> {
        Runtime::new(NoLimitTracker::default(), NoopTracer)
    }

    fn scan_one(rt: &mut Runtime<NoLimitTracker, NoopTracer>, src: &str) -> Cell {
        let mut tracer = NoopTracer;
        let series = crate::scanner::scan(&mut rt.heap, &mut rt.symbols, &mut tracer, src, "test").expect("scan");
        let id = rt.heap.alloc(series).expect("alloc");
        rt.heap.manage(id);
        let user_ctx = context::make_context(&mut rt.heap, ContextKind::Object, &[]).expect("user context");
        binder::bind_deep_declarative(&mut rt.heap, id, user_ctx, rt.system).expect("bind");
        eval_block_to_end(rt, id, Specifier::Context(user_ctx)).expect("eval")
    }

    #[test]
    fn inert_literal_evaluates_to_itself() {
        let mut rt = rt();
        let out = scan_one(&mut rt, "42");
        assert!(matches!(out.payload(), Payload::Integer(42)));
    }

    #[test]
    fn set_word_then_lookup() {
        let mut rt = rt();
        let out = scan_one(&mut rt, "x: 10 x");
        assert!(matches!(out.payload(), Payload::Integer(10)));
    }
}
