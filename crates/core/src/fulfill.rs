//! Argument-fulfillment sub-machine, spec §4.H.3.
//!
//! Grounded on the teacher's own argument-marshalling step in
//! `bytecode/vm/call.rs` (`ArgValues`/`KwargsValues` construction ahead of a
//! dispatch), generalized from Python's positional/keyword calling
//! convention to the paramlist-driven per-class table spec §4.H.3 defines.

use smallvec::SmallVec;

use crate::action::{ActionId, ParamClass, ParamSpec, ParamTags};
use crate::cell::{Binding, Cell, CellFlags};
use crate::context::ContextId;
use crate::errors::{ErrorId, FailError, RunResult};
use crate::feed::{Feed, FeedFlags};
use crate::resource::ResourceTracker;
use crate::runtime::Runtime;
use crate::symbol::Symbol;
use crate::tracer::EvalTracer;

/// Outcome of fulfilling one action's full argument list, spec §4.H.3.
pub struct Fulfilled {
    pub args: SmallVec<[Cell; 4]>,
}

/// Fulfills `action`'s parameters by consuming `feed`, spec §4.H.3's table.
/// `arg_from_out`, if set, is spliced in as the first parameter's value
/// (spec §4.H.2 "enfix dispatch always runs with NEXT_ARG_FROM_OUT set").
pub fn fulfill_args<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    feed: &mut Feed,
    action: ActionId,
    arg_from_out: Option<Cell>,
    varlist: ContextId,
) -> RunResult<Fulfilled> {
    let params: SmallVec<[ParamSpec; 4]> = rt.actions.get(action).params.clone();
    let mut args: SmallVec<[Cell; 4]> = SmallVec::with_capacity(params.len());
    let mut arg_from_out = arg_from_out;
    let mut last_refinement_used = false;

    for param in &params {
        let mut cell = fulfill_one(rt, feed, param, arg_from_out.take(), varlist, last_refinement_used)?;
        if param.tags.contains(ParamTags::REFINEMENT) {
            last_refinement_used = matches!(cell.payload(), crate::cell::Payload::Logic(true));
        }
        cell.set_flag(CellFlags::ARG_MARKED_CHECKED);
        args.push(cell);
    }

    Ok(Fulfilled { args })
}

fn fulfill_one<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    feed: &mut Feed,
    param: &ParamSpec,
    from_out: Option<Cell>,
    varlist: ContextId,
    refinement_active: bool,
) -> RunResult<Cell> {
    if let Some(value) = &param.specialized {
        return Ok(value.copy_cell());
    }

    if param.tags.contains(ParamTags::REFINEMENT_ARG) {
        return fulfill_refinement_arg(rt, feed, param, refinement_active);
    }

    match param.class {
        ParamClass::Local => Ok(Cell::init_null(false)),
        ParamClass::Return | ParamClass::Output => {
            // The real native binding is installed here now that the
            // callee's varlist id is known, spec §4.H.4.
            let mut cell = crate::evaluator::bind_return_slot(rt, varlist);
            cell.set_flag(CellFlags::ARG_MARKED_CHECKED);
            Ok(cell)
        }
        ParamClass::Normal if param.tags.contains(ParamTags::VARIADIC) => {
            // Spec §4.G/§4.H.3 VARIADIC row: the parameter receives a handle
            // over the feed's *remaining* cells rather than a pre-evaluated
            // value; the callee pulls further values lazily via
            // `crate::feed::take_variadic_value`.
            Ok(Cell::init_series(crate::cell::Kind::Varargs, feed.array(), feed.index(), false))
        }
        ParamClass::Normal if param.tags.contains(ParamTags::REFINEMENT) => {
            fulfill_refinement(rt, feed, param)
        }
        ParamClass::Normal => {
            if let Some(value) = from_out {
                feed.set_flag(FeedFlags::NO_LOOKAHEAD);
                return type_check(value, param);
            }
            // A NORMAL argument is a full nested expression, not a single
            // step: `f n - 1` must fulfill f's argument with `n - 1` as a
            // whole (picking up `-`'s own enfix dispatch), not just `n`.
            let value = crate::evaluator::eval_full_expression(rt, feed)?;
            type_check(value, param)
        }
        ParamClass::Hard | ParamClass::Medium => {
            let Some(cell) = feed.consume(&rt.heap) else {
                return fulfill_missing(param);
            };
            type_check(cell, param)
        }
        ParamClass::Soft => {
            let Some(cell) = feed.peek().cloned() else {
                return fulfill_missing(param);
            };
            if matches!(cell.kind(), crate::cell::Kind::Group | crate::cell::Kind::GetWord | crate::cell::Kind::GetPath) {
                let value = crate::evaluator::eval_full_expression(rt, feed)?;
                type_check(value, param)
            } else {
                feed.consume(&rt.heap);
                type_check(cell, param)
            }
        }
        ParamClass::Modal => {
            // Spec §4.F MODAL row: an `@word` argument cues the refinement
            // form of the parameter (the callee sees a SYM-WORD! rather than
            // the word's looked-up value); anything else fulfills normally.
            if let Some(value) = from_out {
                return type_check(value, param);
            }
            if matches!(feed.peek().map(Cell::kind), Some(crate::cell::Kind::SymWord)) {
                let Some(cell) = feed.consume(&rt.heap) else {
                    return fulfill_missing(param);
                };
                return type_check(cell, param);
            }
            let value = crate::evaluator::eval_full_expression(rt, feed)?;
            type_check(value, param)
        }
    }
}

fn fulfill_missing(param: &ParamSpec) -> RunResult<Cell> {
    if param.tags.contains(ParamTags::ENDABLE) {
        let mut c = Cell::init_null(false);
        c.set_flag(CellFlags::ARG_MARKED_CHECKED);
        Ok(c)
    } else {
        Err(FailError::simple(ErrorId::NoArg, format!("no argument for parameter #{}", param.symbol)).into())
    }
}

/// Spec §4.H.3 `REFINEMENT` row, simplified: refinements are looked up as a
/// `/name` path segment already consumed by the caller and stashed on the
/// feed's specifier chain is out of scope here; this runtime treats an
/// unspecialized refinement as simply "not used" unless a native supplies
/// one via `Runtime::data_stack` (the "pushed-refinement stack" spec
/// mentions), consulted by `evaluator::push_refinement`.
fn fulfill_refinement<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    _feed: &mut Feed,
    param: &ParamSpec,
) -> RunResult<Cell> {
    let used = rt
        .data_stack
        .iter()
        .any(|cell| matches!(cell.payload(), crate::cell::Payload::Word { symbol, .. } if *symbol == param.symbol));
    Ok(Cell::init_logic(used, false))
}

/// Spec §4.H.3 REFINEMENT row's "pickup" pass for the one trailing argument
/// a refinement-with-arg declares: only consumed from the feed when the
/// preceding `ParamTags::REFINEMENT` slot came back used, else left null
/// without touching the feed at all.
fn fulfill_refinement_arg<T: ResourceTracker, Tr: EvalTracer>(
    rt: &mut Runtime<T, Tr>,
    feed: &mut Feed,
    param: &ParamSpec,
    refinement_active: bool,
) -> RunResult<Cell> {
    if !refinement_active {
        let mut c = Cell::init_null(false);
        c.set_flag(CellFlags::ARG_MARKED_CHECKED);
        return Ok(c);
    }
    let value = crate::evaluator::eval_full_expression(rt, feed)?;
    type_check(value, param)
}

fn type_check(value: Cell, param: &ParamSpec) -> RunResult<Cell> {
    if param.type_set == u64::MAX {
        return Ok(value);
    }
    let bit = 1u64 << (value.heart() as u64 % 64);
    if param.type_set & bit == 0 {
        return Err(FailError::simple(
            ErrorId::ArgType,
            format!("argument to #{} is of unexpected type {}", param.symbol, value.heart()),
        )
        .into());
    }
    Ok(value)
}

/// Records a refinement as "requested" on the data stack ahead of
/// fulfillment, spec §4.H.3 "scan the pushed-refinement stack for a match."
pub fn push_refinement_word(rt: &mut Runtime<impl ResourceTracker, impl EvalTracer>, symbol: Symbol) {
    rt.data_stack.push(Cell::init_word(crate::cell::Kind::Word, symbol, Binding::Unbound, false));
}
