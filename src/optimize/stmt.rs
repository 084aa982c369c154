//! Statement optimizer (spec §4.F).
//!
//! Runs bottom-up like the expression optimizer, returning a mutation count
//! so the caller can drive both passes to a combined fixed point. Order
//! matters here: children are simplified before the parent is examined, so
//! e.g. an `if` whose body was just emptied by a nested rewrite is caught by
//! the same sweep rather than needing an extra round.

use crate::ast::{
    AssignTarget, Assignment, BinOp, Expr, IncrDecrOp, Module, PrefixOp, Statement, Subroutine,
};
use crate::heap::Heap;
use crate::position::Position;
use std::collections::HashMap;

/// Runs one bottom-up statement-simplification sweep, returning how many
/// rewrites were made.
pub fn optimize_statements(module: &mut Module, heap: &Heap) -> usize {
    let mut changes = 0usize;
    collapse_tail_calls(module, &mut changes);
    module.statements = simplify_block(std::mem::take(&mut module.statements), &mut changes, heap);
    changes
}

fn simplify_block(stmts: Vec<Statement>, changes: &mut usize, heap: &Heap) -> Vec<Statement> {
    let mut out = Vec::with_capacity(stmts.len());
    for mut stmt in stmts {
        simplify_nested(&mut stmt, changes, heap);
        if let Some(replacement) = simplify_top(stmt, changes, heap) {
            out.extend(replacement);
        }
    }
    remove_redundant_stores(out, changes)
}

/// Two consecutive assignments to the same (structurally equal) target
/// have the earlier one removed, since it is overwritten before it can be
/// observed. Memory-mapped targets are excluded: a raw-address store can
/// be read by something outside this module's view (spec §4.F).
fn remove_redundant_stores(stmts: Vec<Statement>, changes: &mut usize) -> Vec<Statement> {
    let mut out: Vec<Statement> = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        if let Statement::Assignment(Assignment { targets, .. }) = &stmt {
            if targets.len() == 1 && !matches!(targets[0], AssignTarget::Memory { .. }) {
                if let Some(Statement::Assignment(Assignment { targets: prev, .. })) = out.last() {
                    if prev.len() == 1 && prev[0].structurally_equal(&targets[0]) {
                        out.pop();
                        *changes += 1;
                    }
                }
            }
        }
        out.push(stmt);
    }
    out
}

/// Builds a map from subroutine name to the label its first non-declaration
/// statement jumps to, for subroutines that are nothing but a single-hop
/// redirect (spec §4.F "tail-call to single-jump subroutine"), then rewrites
/// every call/jump referencing such a subroutine to target the label
/// directly. Chains of such subroutines resolve to their ultimate target.
fn collapse_tail_calls(module: &mut Module, changes: &mut usize) {
    let mut redirects: HashMap<String, String> = HashMap::new();
    crate::visit::walk_statements(module, |stmt| {
        if let Statement::Subroutine(sub) = stmt {
            if let Some(Statement::Jump { target, .. }) =
                sub.statements.iter().find(|s| !matches!(s, Statement::VarDecl(_)))
            {
                redirects.insert(sub.name.clone(), target.clone());
            }
        }
    });
    if redirects.is_empty() {
        return;
    }
    crate::visit::walk_statements_mut(module, |stmt| {
        rewrite_calls_in_stmt(stmt, &redirects, changes);
    });
}

fn resolve_redirect(redirects: &HashMap<String, String>, start: &str) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    let mut current = redirects.get(start)?.clone();
    while let Some(next) = redirects.get(&current) {
        if !seen.insert(current.clone()) {
            break;
        }
        current = next.clone();
    }
    Some(current)
}

fn rewrite_calls_in_stmt(stmt: &mut Statement, redirects: &HashMap<String, String>, changes: &mut usize) {
    match stmt {
        Statement::Jump { target, .. } | Statement::FunctionCallStatement { target, .. } => {
            if let Some(resolved) = resolve_redirect(redirects, target) {
                if &resolved != target {
                    *target = resolved;
                    *changes += 1;
                }
            }
        }
        _ => {}
    }
    match stmt {
        Statement::FunctionCallStatement { args, .. } => {
            for a in args {
                rewrite_calls_in_expr(a, redirects, changes);
            }
        }
        Statement::Assignment(a) => rewrite_calls_in_expr(&mut a.value, redirects, changes),
        Statement::Return { values, .. } => {
            for v in values {
                rewrite_calls_in_expr(v, redirects, changes);
            }
        }
        Statement::IfStatement { condition, .. } => rewrite_calls_in_expr(condition, redirects, changes),
        Statement::WhileLoop { condition, .. } => rewrite_calls_in_expr(condition, redirects, changes),
        Statement::RepeatLoop { until, .. } => rewrite_calls_in_expr(until, redirects, changes),
        Statement::ForLoop { iterable, .. } => rewrite_calls_in_expr(iterable, redirects, changes),
        _ => {}
    }
}

fn rewrite_calls_in_expr(expr: &mut Expr, redirects: &HashMap<String, String>, changes: &mut usize) {
    match expr {
        Expr::FunctionCall { target, args, .. } => {
            for a in args.iter_mut() {
                rewrite_calls_in_expr(a, redirects, changes);
            }
            if let Some(resolved) = resolve_redirect(redirects, target) {
                if &resolved != target {
                    *target = resolved;
                    *changes += 1;
                }
            }
        }
        Expr::Binary { left, right, .. } => {
            rewrite_calls_in_expr(left, redirects, changes);
            rewrite_calls_in_expr(right, redirects, changes);
        }
        Expr::Prefix { inner, .. } => rewrite_calls_in_expr(inner, redirects, changes),
        Expr::ArrayIndexed { index, .. } => rewrite_calls_in_expr(index, redirects, changes),
        Expr::Range { from, to, step, .. } => {
            rewrite_calls_in_expr(from, redirects, changes);
            rewrite_calls_in_expr(to, redirects, changes);
            if let Some(s) = step {
                rewrite_calls_in_expr(s, redirects, changes);
            }
        }
        Expr::Typecast { value, .. } => rewrite_calls_in_expr(value, redirects, changes),
        Expr::DirectMemoryRead { addr, .. } => rewrite_calls_in_expr(addr, redirects, changes),
        _ => {}
    }
}

/// Recurses into a statement's own nested bodies (block/sub/if/loop) before
/// `simplify_top` looks at the statement itself.
fn simplify_nested(stmt: &mut Statement, changes: &mut usize, heap: &Heap) {
    match stmt {
        Statement::Block(b) => {
            b.statements = simplify_block(std::mem::take(&mut b.statements), changes, heap);
        }
        Statement::Subroutine(sub) => {
            sub.statements = simplify_block(std::mem::take(&mut sub.statements), changes, heap);
            strip_redundant_trailing_return(sub, changes);
        }
        Statement::AnonymousScope(a) => {
            a.statements = simplify_block(std::mem::take(&mut a.statements), changes, heap);
        }
        Statement::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            *then_branch = simplify_block(std::mem::take(then_branch), changes, heap);
            *else_branch = simplify_block(std::mem::take(else_branch), changes, heap);
        }
        Statement::ForLoop { body, .. }
        | Statement::WhileLoop { body, .. }
        | Statement::RepeatLoop { body, .. } => {
            *body = simplify_block(std::mem::take(body), changes, heap);
        }
        _ => {}
    }
}

/// A subroutine body ending in a bare `return;` has that return removed,
/// since falling off the end of the body is equivalent (spec §4.F).
fn strip_redundant_trailing_return(sub: &mut Subroutine, changes: &mut usize) {
    if let Some(Statement::Return { values, .. }) = sub.statements.last() {
        if values.is_empty() {
            sub.statements.pop();
            *changes += 1;
        }
    }
}

/// Decides the fate of a single (already-simplified-inside) statement:
/// `None` drops it, `Some(vec![...])` replaces it with zero or more
/// statements (usually exactly one, sometimes the unwrapped body of a
/// now-trivial scope).
fn simplify_top(stmt: Statement, changes: &mut usize, heap: &Heap) -> Option<Vec<Statement>> {
    match stmt {
        Statement::Block(ref b) if b.statements.is_empty() && !b.force_output => {
            *changes += 1;
            None
        }
        Statement::Subroutine(ref sub) if sub.statements.is_empty() && !sub.is_asm_subroutine => {
            *changes += 1;
            None
        }
        Statement::AnonymousScope(a) => {
            *changes += 1;
            Some(a.statements)
        }
        Statement::NopStatement { .. } => {
            *changes += 1;
            None
        }
        Statement::IfStatement {
            condition,
            then_branch,
            else_branch,
            position,
        } => Some(simplify_if(condition, then_branch, else_branch, position, changes)),
        Statement::WhileLoop {
            condition,
            body,
            position,
        } => Some(simplify_while(condition, body, position, changes)),
        Statement::RepeatLoop {
            body,
            until,
            position,
        } => Some(simplify_repeat(body, until, position, changes)),
        Statement::ForLoop { body, .. } if body.is_empty() => {
            *changes += 1;
            None
        }
        Statement::Assignment(assignment) => Some(simplify_assignment(assignment, changes)),
        Statement::FunctionCallStatement {
            target,
            args,
            position,
        } if target == "c64scr.print" && args.len() == 1 => {
            match lower_print_literal(&args[0], &position, heap) {
                Some(lowered) => {
                    *changes += 1;
                    Some(lowered)
                }
                None => Some(vec![Statement::FunctionCallStatement {
                    target,
                    args,
                    position,
                }]),
            }
        }
        other => Some(vec![other]),
    }
}

/// `c64scr.print("c")` with a constant string argument lowers to a
/// `c64.CHROUT(petscii(c))` call per character (spec §4.F), wrapped in an
/// anonymous scope when there is more than one.
fn lower_print_literal(arg: &Expr, position: &Position, heap: &Heap) -> Option<Vec<Statement>> {
    let lit = arg.as_literal()?;
    if !lit.dtype.is_string() {
        return None;
    }
    let text = match heap.get(lit.heap_id()?)? {
        crate::heap::HeapEntry::Str { value, .. } => value.clone(),
        _ => return None,
    };
    let calls: Vec<Statement> = text
        .chars()
        .map(|c| Statement::FunctionCallStatement {
            target: "c64.CHROUT".to_string(),
            args: vec![Expr::FunctionCall {
                target: "petscii".to_string(),
                args: vec![Expr::Literal(crate::value::LiteralValue::ubyte(c as u8, position.clone()))],
                position: position.clone(),
            }],
            position: position.clone(),
        })
        .collect();
    match calls.len() {
        0 => Some(vec![]),
        1 => Some(calls),
        _ => Some(vec![Statement::AnonymousScope(crate::ast::AnonymousScope {
            id: 0,
            statements: calls,
            position: position.clone(),
        })]),
    }
}

fn simplify_if(
    condition: Expr,
    then_branch: Vec<Statement>,
    else_branch: Vec<Statement>,
    position: Position,
    changes: &mut usize,
) -> Vec<Statement> {
    // Constant condition: collapse to whichever branch applies.
    if let Expr::Literal(v) = &condition {
        if let Some(truthy) = v.as_boolean_value() {
            *changes += 1;
            return if truthy { then_branch } else { else_branch };
        }
    }

    if then_branch.is_empty() && else_branch.is_empty() {
        *changes += 1;
        return vec![];
    }

    // An empty `then` with a non-empty `else` is rewritten as a negated
    // condition with the branches swapped, so codegen never has to emit a
    // branch over nothing.
    if then_branch.is_empty() && !else_branch.is_empty() {
        *changes += 1;
        let negated = negate(condition);
        return vec![Statement::IfStatement {
            condition: negated,
            then_branch: else_branch,
            else_branch: vec![],
            position,
        }];
    }

    vec![Statement::IfStatement {
        condition,
        then_branch,
        else_branch,
        position,
    }]
}

fn simplify_while(
    condition: Expr,
    body: Vec<Statement>,
    position: Position,
    changes: &mut usize,
) -> Vec<Statement> {
    if let Expr::Literal(v) = &condition {
        if v.as_boolean_value() == Some(false) {
            *changes += 1;
            return vec![];
        }
    }
    if body.is_empty() {
        // An infinite `while true {}` is left alone (it's meaningful), but
        // a loop with a non-constant condition and no body has no effect
        // other than looping forever on a false condition test, which is
        // already captured above; a conditionally-false empty loop is a
        // no-op.
        return vec![Statement::WhileLoop {
            condition,
            body,
            position,
        }];
    }
    vec![Statement::WhileLoop {
        condition,
        body,
        position,
    }]
}

fn simplify_repeat(
    body: Vec<Statement>,
    until: Expr,
    position: Position,
    changes: &mut usize,
) -> Vec<Statement> {
    if body.is_empty() {
        if let Expr::Literal(v) = &until {
            if v.as_boolean_value() == Some(true) {
                *changes += 1;
                return vec![];
            }
        }
    }
    vec![Statement::RepeatLoop {
        body,
        until,
        position,
    }]
}

fn negate(condition: Expr) -> Expr {
    match condition {
        Expr::Binary {
            left,
            op,
            right,
            position,
        } if op.is_comparison() => {
            let inverted = match op {
                BinOp::Lt => BinOp::Ge,
                BinOp::Gt => BinOp::Le,
                BinOp::Le => BinOp::Gt,
                BinOp::Ge => BinOp::Lt,
                BinOp::Eq => BinOp::Ne,
                BinOp::Ne => BinOp::Eq,
                _ => unreachable!(),
            };
            Expr::Binary {
                left,
                op: inverted,
                right,
                position,
            }
        }
        Expr::Prefix {
            op: PrefixOp::Not,
            inner,
            ..
        } => *inner,
        other => {
            let position = other.position().clone();
            Expr::Prefix {
                op: PrefixOp::Not,
                inner: Box::new(other),
                position,
            }
        }
    }
}

fn simplify_assignment(assignment: Assignment, changes: &mut usize) -> Vec<Statement> {
    let Assignment {
        mut targets,
        aug_op,
        mut value,
        position,
    } = assignment;

    // `x <<= n` / `x >>= n` with a literal shift count expands to `n`
    // in-place `lsl(x)`/`lsr(x)` calls (spec §8 scenario 6), rather than a
    // generic binary shift, since the target hardware has no barrel
    // shifter. A count of 8 or more shifts every bit out of a byte-sized
    // target, so it collapses straight to `x = 0` instead of emitting eight
    // no-op calls. The optimizer runs before the checker assigns widths, so
    // this treats every shift target as byte-sized; a future word-width
    // variant would need type context threaded in here (see DESIGN.md).
    if let Some(shift_op @ (BinOp::Shl | BinOp::Shr)) = aug_op {
        if targets.len() == 1 {
            if let Some(count) = value.as_literal().and_then(|l| l.as_integer_value()) {
                *changes += 1;
                if count >= 8 {
                    return vec![Statement::Assignment(Assignment {
                        targets,
                        aug_op: None,
                        value: Expr::Literal(crate::value::LiteralValue::ubyte(0, position.clone())),
                        position,
                    })];
                }
                if let Some(lhs) = target_as_expr(&targets[0]) {
                    let builtin = if shift_op == BinOp::Shl { "lsl" } else { "lsr" };
                    return (0..count)
                        .map(|_| Statement::FunctionCallStatement {
                            target: builtin.to_string(),
                            args: vec![lhs.clone()],
                            position: position.clone(),
                        })
                        .collect();
                }
            }
        }
    }

    // Desugar `x += v` into `x = x op v` so downstream passes only ever see
    // plain assignments (spec §4.G).
    if let Some(op) = aug_op {
        if targets.len() == 1 {
            let lhs_expr = target_as_expr(&targets[0]);
            if let Some(lhs) = lhs_expr {
                value = Expr::Binary {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(value),
                    position: position.clone(),
                };
                *changes += 1;
            }
        }
    }

    // Self-assignment (`x = x`) has no effect and is dropped entirely.
    if targets.len() == 1 {
        if let Some(lhs) = target_as_expr(&targets[0]) {
            if crate::ast::exprs_structurally_equal(&lhs, &value) {
                *changes += 1;
                return vec![];
            }
        }
    }

    // General strength reduction on `x = x op N`: an identity operand drops
    // the statement entirely (`+0 -0 *1 /1 **1 |0 ^0 <<0 >>0`).
    if targets.len() == 1 {
        if let Some(lhs) = target_as_expr(&targets[0]) {
            if let Expr::Binary { left, op, right, .. } = &value {
                if exprs_eq(left, &lhs) && is_identity_rhs(*op, right) {
                    *changes += 1;
                    return vec![];
                }
            }
        }
    }

    // `x = x + N` / `x = x - N` within a small constant threshold expands to
    // repeated `++`/`--`, which is cheaper than a full add on this target
    // (spec §4.F): up to 3 for a memory-mapped target, up to 8 otherwise.
    if targets.len() == 1 {
        if let Some(lhs) = target_as_expr(&targets[0]) {
            if let Expr::Binary {
                left,
                op: op @ (BinOp::Add | BinOp::Sub),
                right,
                ..
            } = &value
            {
                if exprs_eq(left, &lhs) {
                    if let Some(n) = right.as_literal().and_then(|l| l.as_integer_value()) {
                        let max = if matches!(targets[0], AssignTarget::Memory { .. }) {
                            3
                        } else {
                            8
                        };
                        if (1..=max).contains(&n) {
                            *changes += 1;
                            let incr_op = if *op == BinOp::Add {
                                IncrDecrOp::Incr
                            } else {
                                IncrDecrOp::Decr
                            };
                            return (0..n)
                                .map(|_| Statement::PostIncrDecr {
                                    target: targets[0].clone(),
                                    op: incr_op,
                                    position: position.clone(),
                                })
                                .collect();
                        }
                    }
                }
            }
        }
    }

    // Strength reduction: `x = x + x` -> `x = x * 2`.
    if targets.len() == 1 {
        if let Some(lhs) = target_as_expr(&targets[0]) {
            if let Expr::Binary {
                left,
                op: BinOp::Add,
                right,
                position: bin_pos,
            } = &value
            {
                if exprs_eq(left, &lhs) && exprs_eq(right, &lhs) {
                    *changes += 1;
                    value = Expr::Binary {
                        left: Box::new(lhs.clone()),
                        op: BinOp::Mul,
                        right: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(
                            2,
                            bin_pos.clone(),
                        ))),
                        position: bin_pos.clone(),
                    };
                }
            }
        }
    }

    vec![Statement::Assignment(Assignment {
        targets: std::mem::take(&mut targets),
        aug_op: None,
        value,
        position,
    })]
}

/// Whether `right` is the identity literal for `op` in `x = x op right`.
fn is_identity_rhs(op: BinOp, right: &Expr) -> bool {
    let Some(n) = right.as_literal().and_then(|l| l.as_numeric_value()) else {
        return false;
    };
    match op {
        BinOp::Add | BinOp::Sub | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => n == 0.0,
        BinOp::Mul | BinOp::Div | BinOp::Pow => n == 1.0,
        _ => false,
    }
}

fn exprs_eq(a: &Expr, b: &Expr) -> bool {
    crate::ast::exprs_structurally_equal(a, b)
}

fn target_as_expr(target: &AssignTarget) -> Option<Expr> {
    match target {
        AssignTarget::Identifier { name, position } => Some(Expr::Identifier {
            name: name.clone(),
            position: position.clone(),
        }),
        AssignTarget::Indexed {
            name,
            index,
            position,
        } => Some(Expr::ArrayIndexed {
            name: name.clone(),
            index: Box::new(index.clone()),
            position: position.clone(),
        }),
        AssignTarget::Register(reg) => Some(Expr::RegisterExpr {
            register: *reg,
            position: Position::synthetic(),
        }),
        AssignTarget::Memory { addr, position } => Some(Expr::DirectMemoryRead {
            addr: Box::new(addr.clone()),
            position: position.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LiteralValue;

    fn pos() -> Position {
        Position::synthetic()
    }

    #[test]
    fn removes_empty_block() {
        let mut module = Module {
            statements: vec![Statement::Block(crate::ast::Block {
                id: 1,
                name: "unused".into(),
                address: None,
                statements: vec![],
                force_output: false,
                position: pos(),
            })],
        };
        let changes = optimize_statements(&mut module, &Heap::new());
        assert_eq!(changes, 1);
        assert!(module.statements.is_empty());
    }

    #[test]
    fn collapses_constant_true_if() {
        let mut module = Module {
            statements: vec![Statement::IfStatement {
                condition: Expr::Literal(LiteralValue::from_boolean(true, pos())),
                then_branch: vec![Statement::nop(pos())],
                else_branch: vec![],
                position: pos(),
            }],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 0);
    }

    #[test]
    fn swaps_empty_then_branch() {
        let mut module = Module {
            statements: vec![Statement::IfStatement {
                condition: Expr::Identifier {
                    name: "flag".into(),
                    position: pos(),
                },
                then_branch: vec![],
                else_branch: vec![Statement::Label {
                    name: "else_body".into(),
                    position: pos(),
                }],
                position: pos(),
            }],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[0] {
            Statement::IfStatement {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                assert!(matches!(condition, Expr::Prefix { op: PrefixOp::Not, .. }));
                assert_eq!(then_branch.len(), 1);
                assert!(else_branch.is_empty());
            }
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn removes_self_assignment() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: None,
                value: Expr::Identifier {
                    name: "x".into(),
                    position: pos(),
                },
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert!(module.statements.is_empty());
    }

    #[test]
    fn strength_reduces_self_addition_to_multiply_by_two() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: None,
                value: Expr::Binary {
                    left: Box::new(Expr::Identifier {
                        name: "x".into(),
                        position: pos(),
                    }),
                    op: BinOp::Add,
                    right: Box::new(Expr::Identifier {
                        name: "x".into(),
                        position: pos(),
                    }),
                    position: pos(),
                },
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[0] {
            Statement::Assignment(a) => match &a.value {
                Expr::Binary { op: BinOp::Mul, right, .. } => {
                    assert_eq!(
                        right.as_literal().unwrap().as_integer_value(),
                        Some(2)
                    );
                }
                _ => panic!("expected multiply"),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn desugars_augmented_assignment() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Add),
                value: Expr::Literal(LiteralValue::ubyte(1, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[0] {
            Statement::Assignment(a) => {
                assert!(a.aug_op.is_none());
                assert!(matches!(a.value, Expr::Binary { op: BinOp::Add, .. }));
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn expands_small_shift_into_lsl_calls() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Shl),
                value: Expr::Literal(LiteralValue::ubyte(3, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 3);
        for stmt in &module.statements {
            match stmt {
                Statement::FunctionCallStatement { target, args, .. } => {
                    assert_eq!(target, "lsl");
                    assert_eq!(args.len(), 1);
                }
                _ => panic!("expected lsl call"),
            }
        }
    }

    #[test]
    fn large_shift_collapses_to_zero_assignment() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Shl),
                value: Expr::Literal(LiteralValue::ubyte(9, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 1);
        match &module.statements[0] {
            Statement::Assignment(a) => {
                assert_eq!(a.value, Expr::Literal(LiteralValue::ubyte(0, pos())));
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn strips_redundant_trailing_return() {
        let mut module = Module {
            statements: vec![Statement::Subroutine(Subroutine {
                id: 1,
                name: "f".into(),
                params: vec![],
                returntypes: vec![],
                statements: vec![
                    Statement::Label {
                        name: "body".into(),
                        position: pos(),
                    },
                    Statement::Return {
                        values: vec![],
                        position: pos(),
                    },
                ],
                is_asm_subroutine: false,
                asm_address: None,
                asm_parameter_registers: vec![],
                asm_returnvalues_registers: vec![],
                asm_clobbers: vec![],
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[0] {
            Statement::Subroutine(sub) => assert_eq!(sub.statements.len(), 1),
            _ => panic!("expected subroutine"),
        }
    }

    fn assign_ubyte(name: &str, v: u8) -> Statement {
        Statement::Assignment(Assignment {
            targets: vec![AssignTarget::Identifier {
                name: name.into(),
                position: pos(),
            }],
            aug_op: None,
            value: Expr::Literal(LiteralValue::ubyte(v, pos())),
            position: pos(),
        })
    }

    #[test]
    fn removes_the_earlier_of_two_redundant_stores() {
        let mut module = Module {
            statements: vec![assign_ubyte("x", 1), assign_ubyte("x", 2)],
        };
        let changes = optimize_statements(&mut module, &Heap::new());
        assert_eq!(changes, 1);
        assert_eq!(module.statements.len(), 1);
        match &module.statements[0] {
            Statement::Assignment(a) => {
                assert_eq!(a.value, Expr::Literal(LiteralValue::ubyte(2, pos())));
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn does_not_dedupe_redundant_stores_to_memory() {
        let mem_store = |v: u8| {
            Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Memory {
                    addr: Expr::Literal(LiteralValue::uword(0xd020, pos())),
                    position: pos(),
                }],
                aug_op: None,
                value: Expr::Literal(LiteralValue::ubyte(v, pos())),
                position: pos(),
            })
        };
        let mut module = Module {
            statements: vec![mem_store(1), mem_store(2)],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 2);
    }

    #[test]
    fn collapses_call_to_a_single_jump_subroutine() {
        let mut module = Module {
            statements: vec![
                Statement::Subroutine(Subroutine {
                    id: 1,
                    name: "redirector".into(),
                    params: vec![],
                    returntypes: vec![],
                    statements: vec![Statement::Jump {
                        target: "target".into(),
                        position: pos(),
                    }],
                    is_asm_subroutine: false,
                    asm_address: None,
                    asm_parameter_registers: vec![],
                    asm_returnvalues_registers: vec![],
                    asm_clobbers: vec![],
                    position: pos(),
                }),
                Statement::FunctionCallStatement {
                    target: "redirector".into(),
                    args: vec![],
                    position: pos(),
                },
            ],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[1] {
            Statement::FunctionCallStatement { target, .. } => assert_eq!(target, "target"),
            _ => panic!("expected call statement"),
        }
    }

    #[test]
    fn lowers_a_single_character_print_to_a_chrout_call() {
        let mut heap = Heap::new();
        let id = heap.alloc_string("A".to_string(), false);
        let mut module = Module {
            statements: vec![Statement::FunctionCallStatement {
                target: "c64scr.print".into(),
                args: vec![Expr::Literal(LiteralValue::heap(
                    crate::datatype::DataType::Str,
                    id,
                    pos(),
                ))],
                position: pos(),
            }],
        };
        optimize_statements(&mut module, &heap);
        assert_eq!(module.statements.len(), 1);
        match &module.statements[0] {
            Statement::FunctionCallStatement { target, args, .. } => {
                assert_eq!(target, "c64.CHROUT");
                match &args[0] {
                    Expr::FunctionCall { target, .. } => assert_eq!(target, "petscii"),
                    other => panic!("expected petscii call, got {other:?}"),
                }
            }
            _ => panic!("expected call statement"),
        }
    }

    #[test]
    fn lowers_a_two_character_print_into_two_chrout_calls() {
        let mut heap = Heap::new();
        let id = heap.alloc_string("Hi".to_string(), false);
        let mut module = Module {
            statements: vec![Statement::FunctionCallStatement {
                target: "c64scr.print".into(),
                args: vec![Expr::Literal(LiteralValue::heap(
                    crate::datatype::DataType::Str,
                    id,
                    pos(),
                ))],
                position: pos(),
            }],
        };
        optimize_statements(&mut module, &heap);
        match &module.statements[0] {
            Statement::AnonymousScope(a) => assert_eq!(a.statements.len(), 2),
            other => panic!("expected anonymous scope, got {other:?}"),
        }
    }

    #[test]
    fn expands_shr_into_lsr_calls() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Shr),
                value: Expr::Literal(LiteralValue::ubyte(2, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 2);
        for stmt in &module.statements {
            match stmt {
                Statement::FunctionCallStatement { target, .. } => assert_eq!(target, "lsr"),
                _ => panic!("expected lsr call"),
            }
        }
    }

    #[test]
    fn large_shr_collapses_to_zero_assignment() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Shr),
                value: Expr::Literal(LiteralValue::ubyte(8, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        match &module.statements[0] {
            Statement::Assignment(a) => assert_eq!(a.value, Expr::Literal(LiteralValue::ubyte(0, pos()))),
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn identity_addition_of_zero_is_dropped() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Add),
                value: Expr::Literal(LiteralValue::ubyte(0, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert!(module.statements.is_empty());
    }

    #[test]
    fn small_increment_expands_to_postincrdecr() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Identifier {
                    name: "x".into(),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Add),
                value: Expr::Literal(LiteralValue::ubyte(3, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        assert_eq!(module.statements.len(), 3);
        for stmt in &module.statements {
            match stmt {
                Statement::PostIncrDecr { op: IncrDecrOp::Incr, .. } => {}
                other => panic!("expected ++ expansion, got {other:?}"),
            }
        }
    }

    #[test]
    fn memory_target_increment_threshold_is_lower_than_variable() {
        let mut module = Module {
            statements: vec![Statement::Assignment(Assignment {
                targets: vec![AssignTarget::Memory {
                    addr: Expr::Literal(LiteralValue::uword(0xd020, pos())),
                    position: pos(),
                }],
                aug_op: Some(BinOp::Add),
                value: Expr::Literal(LiteralValue::ubyte(4, pos())),
                position: pos(),
            })],
        };
        optimize_statements(&mut module, &Heap::new());
        // 4 exceeds the memory-target threshold of 3, so it stays a plain add.
        match &module.statements[0] {
            Statement::Assignment(a) => assert!(matches!(a.value, Expr::Binary { op: BinOp::Add, .. })),
            _ => panic!("expected assignment"),
        }
    }
}
