//! Fixed-point tree rewriting (spec §4.E/§4.F).
//!
//! Both sub-passes run to a fixed point independently and are then driven
//! together by `lib.rs`'s pipeline until neither reports a mutation, since a
//! statement-level rewrite (e.g. collapsing a constant `if`) can expose new
//! foldable expressions and vice versa.

pub mod expr;
pub mod stmt;

use crate::ast::Module;
use crate::errors::{CompileError, CompilerException};
use crate::heap::Heap;

/// Rounds beyond this indicate a non-monotone rewrite rule (spec §9): the
/// loop fails fatally rather than spinning forever, since that is an
/// internal compiler bug, not a user-reachable error.
const MAX_ROUNDS: u32 = 100;

/// Runs the expression optimizer and statement optimizer alternately until
/// both report zero mutations in the same round. Each individual pass is
/// idempotent and terminating on its own (monotone decreasing literal
/// arity / statement count), so the combined loop always terminates too.
pub fn optimize_to_fixed_point(
    module: &mut Module,
    heap: &mut Heap,
    errors: &mut Vec<CompileError>,
) {
    for _ in 0..MAX_ROUNDS {
        let expr_changes = expr::optimize_expressions(module, heap, errors);
        let stmt_changes = stmt::optimize_statements(module, heap);
        if expr_changes == 0 && stmt_changes == 0 {
            return;
        }
    }
    CompilerException::fail(format!(
        "optimizer did not reach a fixed point within {MAX_ROUNDS} rounds"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Statement, VarDecl, VarDeclKind};
    use crate::datatype::DataType;
    use crate::position::Position;
    use crate::value::LiteralValue;

    #[test]
    fn converges_on_a_module_needing_multiple_rounds() {
        let pos = Position::synthetic();
        let mut module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::IfStatement {
                    condition: crate::ast::Expr::Literal(LiteralValue::from_boolean(true, pos.clone())),
                    then_branch: vec![Statement::VarDecl(VarDecl {
                        kind: VarDeclKind::Var,
                        dtype: DataType::UByte,
                        name: "x".into(),
                        value: Some(crate::ast::Expr::Binary {
                            left: Box::new(crate::ast::Expr::Literal(LiteralValue::ubyte(1, pos.clone()))),
                            op: crate::ast::BinOp::Add,
                            right: Box::new(crate::ast::Expr::Literal(LiteralValue::ubyte(2, pos.clone()))),
                            position: pos.clone(),
                        }),
                        arraysize: None,
                        zeropage: false,
                        position: pos.clone(),
                    })],
                    else_branch: vec![],
                    position: pos.clone(),
                }],
                force_output: false,
                position: pos.clone(),
            })],
        };
        let mut heap = Heap::new();
        let mut errors = vec![];
        optimize_to_fixed_point(&mut module, &mut heap, &mut errors);
        assert!(errors.is_empty());
        match &module.statements[0] {
            Statement::Block(b) => match &b.statements[0] {
                Statement::VarDecl(v) => {
                    assert_eq!(v.value, Some(crate::ast::Expr::Literal(LiteralValue::ubyte(3, pos))));
                }
                other => panic!("expected vardecl, got {other:?}"),
            },
            other => panic!("expected block, got {other:?}"),
        }
    }
}
