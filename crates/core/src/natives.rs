//! Core native actions installed at boot, spec §4.F/§4.H/§6 ("mezzanine
//! bootstrap... out of scope" bounds this module to the primitives the
//! evaluator contract itself needs demonstrated — arithmetic, the
//! then/else/also branching family, `do`/`reduce`, `comment`/`elide`,
//! `catch`/`throw`, and `func` — rather than a full standard library).
//!
//! Grounded on the teacher's own native registration sweep (`modules/`'s
//! per-builtin `NativeFunction` entries installed into the root namespace
//! ahead of user code running): one `ActionTable` insert per native, keyed
//! into a context the way the teacher keys built-ins into its root
//! namespace.

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::action::{Action, ActionFlags, ActionId, Dispatcher, NativeFn, ParamClass, ParamSpec, ParamTags};
use crate::cell::{Cell, Kind, Payload};
use crate::context::{self, ContextId, ContextKind, Specifier};
use crate::dispatch::CompareResult;
use crate::errors::{ErrorId, FailError, RunResult};
use crate::evaluator;
use crate::frame::Frame;
use crate::resource::ResourceTracker;
use crate::runtime::Runtime;
use crate::symbol::Symbol;
use crate::tracer::EvalTracer;

/// Installs every native action plus the comparison/mold dispatch hooks,
/// returning the base context they're bound into. Called once per `Runtime`
/// during the `natives` boot sub-block (spec §6).
pub fn install<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>) -> RunResult<ContextId> {
    install_dispatch(rt);

    let mut entries: Vec<(Symbol, Cell)> = Vec::new();
    let mut def = |rt: &mut Runtime<T, Tr>, entries: &mut Vec<(Symbol, Cell)>, name: &str, params: &[(&str, ParamClass, ParamTags)], flags: ActionFlags, f: NativeFn<T, Tr>| {
        let symbol = rt.symbols.intern(name);
        let params: SmallVec<[ParamSpec; 4]> = params
            .iter()
            .map(|(pname, class, tags)| ParamSpec::new(rt.symbols.intern(pname), *class).with_tags(*tags))
            .collect();
        let action_id = rt.actions.insert(Action {
            name: symbol,
            params,
            dispatcher: Dispatcher::Native(f),
            flags,
            meta: None,
            definition_specifier: Specifier::None,
        });
        entries.push((symbol, Cell::init_action(action_id)));
    };

    let none = ParamTags::default();
    let enfix = ActionFlags::ENFIXED;
    let defer = ActionFlags::ENFIXED | ActionFlags::DEFERS_LOOKBACK;

    def(rt, &mut entries, "add", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_add::<T, Tr>);
    def(rt, &mut entries, "subtract", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_subtract::<T, Tr>);
    def(rt, &mut entries, "multiply", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_multiply::<T, Tr>);
    def(rt, &mut entries, "divide", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_divide::<T, Tr>);
    def(rt, &mut entries, "equal?", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_equal_q::<T, Tr>);

    // Glyph aliases for the spelled arithmetic/comparison natives above:
    // distinct symbols (`symbol.rs` canonicalizes by case only, not by
    // spelling), so each needs its own enfixed entry rather than falling out
    // of the spelled name automatically.
    def(rt, &mut entries, "+", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_add::<T, Tr>);
    def(rt, &mut entries, "-", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_subtract::<T, Tr>);
    def(rt, &mut entries, "*", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_multiply::<T, Tr>);
    def(rt, &mut entries, "/", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_divide::<T, Tr>);
    def(rt, &mut entries, "=", &[("value1", ParamClass::Normal, none), ("value2", ParamClass::Normal, none)], enfix, native_equal_q::<T, Tr>);

    def(rt, &mut entries, "if", &[("condition", ParamClass::Normal, none), ("branch", ParamClass::Hard, none)], ActionFlags::empty(), native_if::<T, Tr>);
    def(rt, &mut entries, "else", &[("left", ParamClass::Normal, none), ("branch", ParamClass::Hard, none)], defer, native_else::<T, Tr>);
    def(rt, &mut entries, "then", &[("left", ParamClass::Normal, none), ("branch", ParamClass::Hard, none)], defer, native_then::<T, Tr>);
    def(rt, &mut entries, "also", &[("left", ParamClass::Normal, none), ("branch", ParamClass::Hard, none)], defer, native_also::<T, Tr>);

    def(rt, &mut entries, "do", &[("value", ParamClass::Normal, none)], ActionFlags::empty(), native_do::<T, Tr>);
    def(rt, &mut entries, "reduce", &[("block", ParamClass::Hard, none)], ActionFlags::empty(), native_reduce::<T, Tr>);
    def(rt, &mut entries, "comment", &[("value", ParamClass::Hard, none)], ActionFlags::IS_INVISIBLE, native_comment::<T, Tr>);
    def(rt, &mut entries, "elide", &[("value", ParamClass::Hard, none)], ActionFlags::IS_INVISIBLE, native_comment::<T, Tr>);

    let refinement = ParamTags::REFINEMENT;
    let refinement_arg = ParamTags::REFINEMENT_ARG | ParamTags::ENDABLE;
    def(
        rt,
        &mut entries,
        "catch",
        &[("body", ParamClass::Hard, none), ("name", ParamClass::Normal, refinement), ("name-value", ParamClass::Normal, refinement_arg)],
        ActionFlags::empty(),
        native_catch::<T, Tr>,
    );
    def(
        rt,
        &mut entries,
        "throw",
        &[("value", ParamClass::Normal, none), ("name", ParamClass::Normal, refinement), ("name-value", ParamClass::Normal, refinement_arg)],
        ActionFlags::empty(),
        native_throw::<T, Tr>,
    );

    def(rt, &mut entries, "func", &[("spec", ParamClass::Hard, none), ("body", ParamClass::Hard, none)], ActionFlags::empty(), native_func::<T, Tr>);

    context::make_context(&mut rt.heap, ContextKind::Module, &entries).map_err(Into::into)
}

fn numeric_binop(a: &Cell, b: &Cell, int_op: fn(i64, i64) -> Option<i64>, dec_op: fn(f64, f64) -> f64) -> RunResult<Cell> {
    match (a.payload(), b.payload()) {
        (Payload::Integer(x), Payload::Integer(y)) => {
            let v = int_op(*x, *y).ok_or_else(|| FailError::simple(ErrorId::Overflow, "integer arithmetic overflowed"))?;
            Ok(Cell::init_integer(v, false))
        }
        (Payload::Integer(x), Payload::Decimal(y)) => Ok(Cell::init_decimal(dec_op(*x as f64, *y), false)),
        (Payload::Decimal(x), Payload::Integer(y)) => Ok(Cell::init_decimal(dec_op(*x, *y as f64), false)),
        (Payload::Decimal(x), Payload::Decimal(y)) => Ok(Cell::init_decimal(dec_op(*x, *y), false)),
        _ => Err(FailError::simple(ErrorId::ArgType, "arithmetic requires INTEGER!/DECIMAL! operands").into()),
    }
}

fn native_add<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, _rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    numeric_binop(&frame.args[0], &frame.args[1], i64::checked_add, |x, y| x + y)
}

fn native_subtract<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, _rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    numeric_binop(&frame.args[0], &frame.args[1], i64::checked_sub, |x, y| x - y)
}

fn native_multiply<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, _rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    numeric_binop(&frame.args[0], &frame.args[1], i64::checked_mul, |x, y| x * y)
}

fn native_divide<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, _rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    numeric_binop(&frame.args[0], &frame.args[1], i64::checked_div, |x, y| x / y)
}

fn native_equal_q<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let result = rt.dispatch.compare(&frame.args[0], &frame.args[1], true)?;
    Ok(Cell::init_logic(result == CompareResult::Equal, false))
}

fn compare_integer(a: &Cell, b: &Cell, _case_sensitive: bool) -> Option<CompareResult> {
    let (Payload::Integer(x), Payload::Integer(y)) = (a.payload(), b.payload()) else { return None };
    Some(order_to_compare(x.cmp(y)))
}

fn compare_decimal(a: &Cell, b: &Cell, _case_sensitive: bool) -> Option<CompareResult> {
    let (Payload::Decimal(x), Payload::Decimal(y)) = (a.payload(), b.payload()) else { return None };
    Some(order_to_compare(x.partial_cmp(y)?))
}

fn compare_logic(a: &Cell, b: &Cell, _case_sensitive: bool) -> Option<CompareResult> {
    let (Payload::Logic(x), Payload::Logic(y)) = (a.payload(), b.payload()) else { return None };
    Some(order_to_compare(x.cmp(y)))
}

fn order_to_compare(ord: Ordering) -> CompareResult {
    match ord {
        Ordering::Less => CompareResult::Less,
        Ordering::Equal => CompareResult::Equal,
        Ordering::Greater => CompareResult::Greater,
    }
}

fn install_dispatch<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>) {
    rt.dispatch.register_compare(Kind::Integer, compare_integer);
    rt.dispatch.register_compare(Kind::Decimal, compare_decimal);
    rt.dispatch.register_compare(Kind::Logic, compare_logic);

    for kind in [Kind::Word, Kind::SetWord, Kind::GetWord, Kind::SymWord] {
        rt.dispatch.register_mold(kind, mold_word::<T, Tr>);
    }
    for kind in [Kind::Block, Kind::Group] {
        rt.dispatch.register_mold(kind, mold_block::<T, Tr>);
    }
}

fn mold_word<T: ResourceTracker, Tr: EvalTracer>(cell: &Cell, rt: &Runtime<T, Tr>) -> String {
    let Payload::Word { symbol, .. } = cell.payload() else {
        return cell.to_string();
    };
    let spelling = rt.symbols.spelling(*symbol);
    match cell.kind() {
        Kind::SetWord => format!("{spelling}:"),
        Kind::GetWord => format!(":{spelling}"),
        Kind::SymWord => format!("@{spelling}"),
        _ => spelling.to_owned(),
    }
}

fn mold_block<T: ResourceTracker, Tr: EvalTracer>(cell: &Cell, rt: &Runtime<T, Tr>) -> String {
    let Payload::Series { id, .. } = cell.payload() else {
        return cell.to_string();
    };
    let (open, close) = if cell.kind() == Kind::Group { ("(", ")") } else { ("[", "]") };
    let cells = rt.heap.get(*id).data.as_array().unwrap_or(&[]).to_vec();
    let inner: Vec<String> = cells.iter().map(|c| rt.dispatch.mold(c, rt)).collect();
    format!("{open}{}{close}", inner.join(" "))
}

/// Spec §4.H: blanks/logic-false/null are the only falsy values; everything
/// else (including `0`) is truthy.
fn truthy(cell: &Cell) -> bool {
    !matches!(cell.payload(), Payload::Logic(false)) && !matches!(cell.kind(), Kind::Blank | Kind::Null)
}

fn block_body<T: ResourceTracker, Tr: EvalTracer>(rt: &mut Runtime<T, Tr>, cell: &Cell) -> RunResult<Cell> {
    let Payload::Series { id, .. } = cell.payload() else {
        return Err(FailError::simple(ErrorId::ArgType, "expected a BLOCK! body").into());
    };
    evaluator::eval_block_to_end(rt, *id, Specifier::None)
}

fn native_if<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    if !truthy(&frame.args[0]) {
        return Ok(Cell::init_null(false));
    }
    block_body(rt, &frame.args[1])
}

fn native_else<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    if frame.args[0].kind() == Kind::Null {
        block_body(rt, &frame.args[1])
    } else {
        Ok(frame.args[0].copy_cell())
    }
}

fn native_then<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    if frame.args[0].kind() == Kind::Null {
        Ok(Cell::init_null(false))
    } else {
        block_body(rt, &frame.args[1])
    }
}

fn native_also<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let left = frame.args[0].copy_cell();
    let result = block_body(rt, &frame.args[1])?;
    if rt.thrown.is_some() {
        return Ok(result);
    }
    Ok(left)
}

fn native_do<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    match frame.args[0].payload() {
        Payload::Series { id, .. } if matches!(frame.args[0].kind(), Kind::Block | Kind::Group) => {
            evaluator::eval_block_to_end(rt, *id, Specifier::None)
        }
        _ => Ok(frame.args[0].copy_cell()),
    }
}

fn native_reduce<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let Payload::Series { id, .. } = frame.args[0].payload() else {
        return Err(FailError::simple(ErrorId::ArgType, "reduce requires a BLOCK!").into());
    };
    let array = *id;
    let mut feed = crate::feed::Feed::new(&rt.heap, array, Specifier::None);
    let mut out = Vec::new();
    while !feed.is_at_end() {
        let value = evaluator::eval_full_expression(rt, &mut feed)?;
        if rt.thrown.is_some() {
            return Ok(value);
        }
        out.push(value.copy_cell());
    }
    let mut series = crate::series::Series::new_array(out.len());
    series.data = crate::series::SeriesData::Array(out);
    let result_id = rt.heap.alloc(series)?;
    rt.heap.manage(result_id);
    Ok(Cell::init_series(Kind::Block, result_id, 0, false))
}

fn native_comment<T: ResourceTracker, Tr: EvalTracer>(_frame: &mut Frame, _rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    Ok(Cell::init_null(false))
}

const GENERIC_THROW_NAME: &str = "--generic-throw--";

fn is_generic_throw<T: ResourceTracker, Tr: EvalTracer>(rt: &Runtime<T, Tr>, label: &Cell) -> bool {
    matches!(label.payload(), Payload::Word { symbol, .. } if rt.symbols.canonical_str(*symbol) == GENERIC_THROW_NAME)
}

/// `catch/name body 'n`, spec §4.H.4/§8: filters by the throw's label symbol
/// rather than catching any unnamed throw. `catch` without `/name` only
/// claims the generic (unnamed) throw marker, spec §4.I "CATCH filters by
/// identity/name equality".
fn native_catch<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let named = matches!(frame.args[1].payload(), Payload::Logic(true));
    let wanted_symbol = named.then(|| match frame.args[2].payload() {
        Payload::Word { symbol, .. } => *symbol,
        _ => rt.symbols.intern(GENERIC_THROW_NAME),
    });

    let result = block_body(rt, &frame.args[0])?;
    let Some(thrown) = &rt.thrown else {
        return Ok(result);
    };
    let claims = match wanted_symbol {
        Some(wanted) => matches!(thrown.label.payload(), Payload::Word { symbol, .. } if *symbol == wanted),
        None => is_generic_throw(rt, &thrown.label),
    };
    if claims {
        let caught = rt.take_thrown().expect("just checked Some");
        return Ok(caught.value);
    }
    Ok(result)
}

/// `throw/name value 'n`, spec §4.H.4/§8: labels the throw with `n`'s symbol
/// instead of the reserved generic marker, so only a matching `CATCH/NAME`
/// claims it.
fn native_throw<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let named = matches!(frame.args[1].payload(), Payload::Logic(true));
    let symbol = if named {
        match frame.args[2].payload() {
            Payload::Word { symbol, .. } => *symbol,
            _ => return Err(FailError::simple(ErrorId::ArgType, "throw/name requires a WORD! name").into()),
        }
    } else {
        rt.symbols.intern(GENERIC_THROW_NAME)
    };
    let label = Cell::init_word(Kind::Word, symbol, crate::cell::Binding::Unbound, false);
    let value = frame.args[0].copy_cell();
    rt.throw_value(label, value);
    Ok(Cell::init_null(false))
}

/// `func [spec] [body]`, spec §4.F/§4.H.4: spec-block WORD! entries become
/// NORMAL parameters (type-block/help-string spec entries are not modeled;
/// see DESIGN.md); a RETURN parameter is always synthesized first.
fn native_func<T: ResourceTracker, Tr: EvalTracer>(frame: &mut Frame, rt: &mut Runtime<T, Tr>) -> RunResult<Cell> {
    let Payload::Series { id: spec_id, .. } = frame.args[0].payload() else {
        return Err(FailError::simple(ErrorId::ArgType, "func requires a BLOCK! spec").into());
    };
    let Payload::Series { id: body_id, .. } = frame.args[1].payload() else {
        return Err(FailError::simple(ErrorId::ArgType, "func requires a BLOCK! body").into());
    };
    let spec_id = *spec_id;
    let body_id = *body_id;
    let spec_cells: Vec<Cell> = rt.heap.get(spec_id).data.as_array().unwrap_or(&[]).to_vec();

    let return_symbol = rt.symbols.intern("return");
    let mut params: SmallVec<[ParamSpec; 4]> = SmallVec::new();
    params.push(ParamSpec::new(return_symbol, ParamClass::Return));
    for cell in &spec_cells {
        if let Payload::Word { symbol, .. } = cell.payload() {
            params.push(ParamSpec::new(*symbol, ParamClass::Normal));
        }
    }

    let name = rt.symbols.intern("anonymous");
    let action_id: ActionId = rt.actions.insert(Action {
        name,
        params,
        dispatcher: Dispatcher::Interpreted { body: body_id },
        flags: ActionFlags::HAS_RETURN,
        meta: None,
        definition_specifier: Specifier::None,
    });
    Ok(Cell::init_action(action_id))
}

#[cfg(test)]
mod tests {
    use crate::resource::NoLimitTracker;
    use crate::tracer::NoopTracer;
    use crate::Interpreter;

    fn interp() -> Interpreter<NoLimitTracker, NoopTracer> {
        Interpreter::startup(NoLimitTracker::default(), NoopTracer).expect("startup")
    }

    #[test]
    fn catch_name_claims_a_matching_named_throw() {
        let mut rt = interp();
        let out = rt.evaluate("catch/name [throw/name 5 'n] 'n").expect("eval");
        assert!(matches!(out.payload(), crate::cell::Payload::Integer(5)));
    }

    #[test]
    fn catch_name_lets_a_mismatched_name_pass_through() {
        let mut rt = interp();
        let err = rt.evaluate("catch/name [throw/name 5 'm] 'n").unwrap_err();
        assert!(matches!(err, crate::errors::EvalError::Fail(ref e) if e.id == crate::errors::ErrorId::NoCatchForThrow));
    }

    #[test]
    fn plain_catch_still_claims_an_unnamed_throw() {
        let mut rt = interp();
        let out = rt.evaluate("catch [throw 5]").expect("eval");
        assert!(matches!(out.payload(), crate::cell::Payload::Integer(5)));
    }
}
