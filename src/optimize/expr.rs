//! Expression optimizer (spec §4.E).
//!
//! Folds constant subtrees bottom-up: identifiers that resolve to a `CONST`
//! declaration are replaced by the constant's literal, then prefix/binary
//! operators over literal operands are evaluated via `crate::eval`, then
//! constant `Range` bounds are checked for validity. Runs to a fixed point
//! driven by a mutation counter (`optimize::optimize_to_fixed_point`); each
//! individual call here performs exactly one bottom-up sweep and returns how
//! many rewrites it made, so the caller knows whether to sweep again.

use crate::ast::{Assignment, BinOp, Expr, Module, Statement, VarDeclKind};
use crate::builtins;
use crate::datatype::DataType;
use crate::errors::CompileError;
use crate::eval;
use crate::heap::Heap;
use crate::position::Position;
use crate::value::LiteralValue;
use std::collections::HashMap;

/// Runs one bottom-up constant-folding sweep over every expression in the
/// module, returning the number of rewrites performed.
pub fn optimize_expressions(module: &mut Module, heap: &mut Heap, errors: &mut Vec<CompileError>) -> usize {
    let consts = collect_constants(module);
    let mut changes = 0usize;
    for stmt in &mut module.statements {
        fold_statement(stmt, &consts, heap, errors, &mut changes);
    }
    changes
}

/// Flat name -> literal table of every `CONST` declaration in the module.
/// Dragonforge constants are not block-scoped shadowable (spec §4.C), so a
/// single flat map is sufficient; a duplicate name is a checker error, not
/// an optimizer concern.
fn collect_constants(module: &Module) -> HashMap<String, LiteralValue> {
    let mut consts = HashMap::new();
    crate::visit::walk_statements(module, |stmt| {
        if let Statement::VarDecl(v) = stmt {
            if v.kind == VarDeclKind::Const {
                if let Some(Expr::Literal(lit)) = &v.value {
                    consts.insert(v.name.clone(), lit.clone());
                }
            }
        }
    });
    consts
}

fn fold_statement(
    stmt: &mut Statement,
    consts: &HashMap<String, LiteralValue>,
    heap: &mut Heap,
    errors: &mut Vec<CompileError>,
    changes: &mut usize,
) {
    match stmt {
        Statement::Block(b) => {
            for s in &mut b.statements {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::Subroutine(sub) => {
            for s in &mut sub.statements {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::AnonymousScope(a) => {
            for s in &mut a.statements {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::VarDecl(v) => {
            if let Some(value) = &mut v.value {
                fold_expr(value, consts, heap, errors, changes);
            }
            if let Some(size) = &mut v.arraysize {
                fold_expr(size, consts, heap, errors, changes);
            }
        }
        Statement::Assignment(Assignment { value, targets, .. }) => {
            fold_expr(value, consts, heap, errors, changes);
            for t in targets {
                if let crate::ast::AssignTarget::Indexed { index, .. } = t {
                    fold_expr(index, consts, heap, errors, changes);
                }
                if let crate::ast::AssignTarget::Memory { addr, .. } = t {
                    fold_expr(addr, consts, heap, errors, changes);
                }
            }
        }
        Statement::Return { values, .. } => {
            for v in values {
                fold_expr(v, consts, heap, errors, changes);
            }
        }
        Statement::IfStatement {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            fold_expr(condition, consts, heap, errors, changes);
            for s in then_branch {
                fold_statement(s, consts, heap, errors, changes);
            }
            for s in else_branch {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::ForLoop { iterable, body, .. } => {
            fold_expr(iterable, consts, heap, errors, changes);
            for s in body {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::WhileLoop { condition, body, .. } => {
            fold_expr(condition, consts, heap, errors, changes);
            for s in body {
                fold_statement(s, consts, heap, errors, changes);
            }
        }
        Statement::RepeatLoop { body, until, .. } => {
            for s in body {
                fold_statement(s, consts, heap, errors, changes);
            }
            fold_expr(until, consts, heap, errors, changes);
        }
        Statement::FunctionCallStatement { args, .. }
        | Statement::BuiltinFunctionStatementPlaceholder { args, .. } => {
            for a in args {
                fold_expr(a, consts, heap, errors, changes);
            }
        }
        _ => {}
    }
}

fn fold_expr(
    expr: &mut Expr,
    consts: &HashMap<String, LiteralValue>,
    heap: &mut Heap,
    errors: &mut Vec<CompileError>,
    changes: &mut usize,
) {
    match expr {
        Expr::Identifier { name, position } => {
            if let Some(lit) = consts.get(name) {
                let mut lit = lit.clone();
                lit.position = position.clone();
                *expr = Expr::Literal(lit);
                *changes += 1;
            }
        }
        Expr::Prefix { op, inner, position } => {
            fold_expr(inner, consts, heap, errors, changes);
            if let Expr::Literal(v) = inner.as_ref() {
                match eval::evaluate_prefix(*op, v, position.clone()) {
                    Ok(folded) => {
                        *expr = Expr::Literal(folded);
                        *changes += 1;
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
        Expr::Binary {
            left,
            op,
            right,
            position,
        } => {
            fold_expr(left, consts, heap, errors, changes);
            fold_expr(right, consts, heap, errors, changes);
            if let (Expr::Literal(a), Expr::Literal(b)) = (left.as_ref(), right.as_ref()) {
                match eval::evaluate(a, *op, b, heap, position.clone()) {
                    Ok(folded) => {
                        *expr = Expr::Literal(folded);
                        *changes += 1;
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
        Expr::ArrayIndexed { index, .. } => {
            fold_expr(index, consts, heap, errors, changes);
        }
        Expr::Typecast { value, dtype, position } => {
            fold_expr(value, consts, heap, errors, changes);
            if let Expr::Literal(v) = value.as_ref() {
                if let Some(n) = v.as_numeric_value() {
                    if let Ok(folded) = crate::value::from_number(n, *dtype, position.clone()) {
                        *expr = Expr::Literal(folded);
                        *changes += 1;
                    }
                }
            }
        }
        Expr::Range { from, to, step, position } => {
            fold_expr(from, consts, heap, errors, changes);
            fold_expr(to, consts, heap, errors, changes);
            if let Some(s) = step {
                fold_expr(s, consts, heap, errors, changes);
            }
            let kind = range_step(step.as_deref());
            let replacement = match (from.as_ref(), to.as_ref()) {
                (Expr::Literal(f), Expr::Literal(t)) if f.dtype.is_string() && t.dtype.is_string() => {
                    materialize_char_range(f, t, kind, heap, position, errors)
                }
                (Expr::Literal(f), Expr::Literal(t)) => materialize_integer_range(f, t, kind, heap, position, errors),
                _ => None,
            };
            if let Some(new_expr) = replacement {
                *expr = new_expr;
                *changes += 1;
            }
        }
        Expr::DirectMemoryRead { addr, .. } => {
            fold_expr(addr, consts, heap, errors, changes);
        }
        Expr::FunctionCall { target, args, position } => {
            for a in args.iter_mut() {
                fold_expr(a, consts, heap, errors, changes);
            }
            if builtins::is_pure(target) && args.iter().all(Expr::is_constant) {
                if let Some(folded) = fold_pure_builtin(target, args, position.clone()) {
                    *expr = Expr::Literal(folded);
                    *changes += 1;
                }
            }
        }
        Expr::Literal(_) | Expr::RegisterExpr { .. } | Expr::AddressOf { .. } => {}
    }
}

/// The step of a `RangeExpr` as seen at fold time: a literal value, the
/// direction implied by the bounds when step is omitted, or unresolved
/// (a non-literal step expression, which blocks materialization until a
/// later sweep folds it).
#[derive(Clone, Copy)]
enum RangeStep {
    Explicit(i64),
    Default,
    Unknown,
}

fn range_step(step: Option<&Expr>) -> RangeStep {
    match step {
        None => RangeStep::Default,
        Some(Expr::Literal(s)) => match s.as_integer_value() {
            Some(v) => RangeStep::Explicit(v),
            None => RangeStep::Unknown,
        },
        Some(_) => RangeStep::Unknown,
    }
}

fn integer_sequence(start: i64, stop: i64, step: i64) -> Vec<i64> {
    let mut values = Vec::new();
    let mut cur = start;
    if step > 0 {
        while cur <= stop {
            values.push(cur);
            cur += step;
        }
    } else {
        while cur >= stop {
            values.push(cur);
            cur += step;
        }
    }
    values
}

fn array_dtype_for(elem: DataType) -> Option<DataType> {
    match elem {
        DataType::UByte => Some(DataType::ArrayUb),
        DataType::Byte => Some(DataType::ArrayB),
        DataType::UWord => Some(DataType::ArrayUw),
        DataType::Word => Some(DataType::ArrayW),
        DataType::Float => Some(DataType::ArrayF),
        _ => None,
    }
}

/// Materializes a constant numeric `Range` (spec §4.E rule 5) into an ARRAY
/// literal of consecutive integers, allocating the backing values onto the
/// heap. Returns `None` (leaving `errors` untouched) when the step can't be
/// resolved yet, or the bound type has no array counterpart.
fn materialize_integer_range(
    f: &LiteralValue,
    t: &LiteralValue,
    step: RangeStep,
    heap: &mut Heap,
    position: &Position,
    errors: &mut Vec<CompileError>,
) -> Option<Expr> {
    let fv = f.as_integer_value()?;
    let tv = t.as_integer_value()?;
    let sv = match step {
        RangeStep::Explicit(v) => v,
        RangeStep::Default => {
            if tv < fv {
                -1
            } else {
                1
            }
        }
        RangeStep::Unknown => return None,
    };
    match eval::materialize_range(fv, tv, Some(sv)) {
        Ok((start, stop, step)) => {
            let array_dtype = array_dtype_for(f.dtype)?;
            let values = integer_sequence(start, stop, step);
            if values.len() > array_dtype.array_max_elements().unwrap_or(usize::MAX) {
                errors.push(CompileError::expression(
                    format!("range has {} elements, which exceeds the maximum for {}", values.len(), array_dtype),
                    position.clone(),
                ));
                return None;
            }
            let id = heap.alloc_array(f.dtype, values, false);
            Some(Expr::Literal(LiteralValue::heap(array_dtype, id, position.clone())))
        }
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

/// Materializes a constant character `Range` (spec §4.E rule 5) into a STR
/// literal spanning the two single-character endpoints inclusive.
fn materialize_char_range(
    f: &LiteralValue,
    t: &LiteralValue,
    step: RangeStep,
    heap: &mut Heap,
    position: &Position,
    errors: &mut Vec<CompileError>,
) -> Option<Expr> {
    let (fc, tc) = match (
        f.heap_id().and_then(|id| heap.get(id).cloned()),
        t.heap_id().and_then(|id| heap.get(id).cloned()),
    ) {
        (
            Some(crate::heap::HeapEntry::Str { value: fv, .. }),
            Some(crate::heap::HeapEntry::Str { value: tv, .. }),
        ) if fv.chars().count() == 1 && tv.chars().count() == 1 => {
            (fv.chars().next().unwrap() as i64, tv.chars().next().unwrap() as i64)
        }
        _ => return None,
    };
    let sv = match step {
        RangeStep::Explicit(v) => v,
        RangeStep::Default => {
            if tc < fc {
                -1
            } else {
                1
            }
        }
        RangeStep::Unknown => return None,
    };
    match eval::materialize_range(fc, tc, Some(sv)) {
        Ok((start, stop, step)) => {
            let text: String = integer_sequence(start, stop, step)
                .into_iter()
                .filter_map(|c| char::from_u32(c as u32))
                .collect();
            let id = heap.alloc_string(text, false);
            Some(Expr::Literal(LiteralValue::heap(f.dtype, id, position.clone())))
        }
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

/// Folds the handful of pure built-ins that are cheap and safe to evaluate
/// at compile time. Anything not listed here is left for codegen to lower
/// at runtime even if its arguments happen to be constant.
fn fold_pure_builtin(name: &str, args: &[Expr], position: crate::position::Position) -> Option<LiteralValue> {
    let arg0 = args.first()?.as_literal()?;
    match name {
        "lsl" => {
            let v = arg0.as_integer_value()? << 1;
            crate::value::optimal_integer(v, position).ok()
        }
        "lsr" => {
            let v = arg0.as_integer_value()? >> 1;
            crate::value::optimal_integer(v, position).ok()
        }
        "msb" => {
            let v = (arg0.as_integer_value()? >> 8) & 0xff;
            crate::value::optimal_integer(v, position).ok()
        }
        "lsb" => {
            let v = arg0.as_integer_value()? & 0xff;
            crate::value::optimal_integer(v, position).ok()
        }
        _ => None,
    }
}
