//! Tree traversal helpers.
//!
//! Per design note 4.9, parent back-references are not maintained
//! incrementally; instead `relink` walks the tree fresh and builds a
//! `ParentMap` from `NodeId` to `NodeId` whenever a pass needs upward
//! lookups (scope resolution, diagnostics that want an enclosing subroutine
//! name). `MODULE_SCOPE` is the implicit root every chain terminates at.

use crate::ast::{
    AnonymousScope, Block, Module, Statement, Subroutine, MODULE_SCOPE,
};
use std::collections::HashMap;

pub type ParentMap = HashMap<u64, u64>;

/// Rebuilds the parent map for `module` from scratch. Cheap enough to call
/// once per pass (modules are at most a few hundred statements deep); never
/// kept around across a mutation.
pub fn relink(module: &Module) -> ParentMap {
    let mut map = ParentMap::new();
    for stmt in &module.statements {
        relink_statement(stmt, MODULE_SCOPE, &mut map);
    }
    map
}

fn relink_statement(stmt: &Statement, parent: u64, map: &mut ParentMap) {
    match stmt {
        Statement::Block(Block { id, statements, .. }) => {
            map.insert(*id, parent);
            for s in statements {
                relink_statement(s, *id, map);
            }
        }
        Statement::Subroutine(Subroutine { id, statements, .. }) => {
            map.insert(*id, parent);
            for s in statements {
                relink_statement(s, *id, map);
            }
        }
        Statement::AnonymousScope(AnonymousScope { id, statements, .. }) => {
            map.insert(*id, parent);
            for s in statements {
                relink_statement(s, *id, map);
            }
        }
        Statement::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            for s in then_branch {
                relink_statement(s, parent, map);
            }
            for s in else_branch {
                relink_statement(s, parent, map);
            }
        }
        Statement::ForLoop { body, .. }
        | Statement::WhileLoop { body, .. }
        | Statement::RepeatLoop { body, .. } => {
            for s in body {
                relink_statement(s, parent, map);
            }
        }
        _ => {}
    }
}

/// Walks every statement in a module (including nested scopes) depth-first,
/// calling `f` on each. Used by passes that need a read-only flat traversal
/// without building a parent map (e.g. collecting all declared names).
pub fn walk_statements<'a, F: FnMut(&'a Statement)>(module: &'a Module, mut f: F) {
    fn walk<'a, F: FnMut(&'a Statement)>(stmts: &'a [Statement], f: &mut F) {
        for s in stmts {
            f(s);
            match s {
                Statement::Block(b) => walk(&b.statements, f),
                Statement::Subroutine(sub) => walk(&sub.statements, f),
                Statement::AnonymousScope(a) => walk(&a.statements, f),
                Statement::IfStatement {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    walk(then_branch, f);
                    walk(else_branch, f);
                }
                Statement::ForLoop { body, .. }
                | Statement::WhileLoop { body, .. }
                | Statement::RepeatLoop { body, .. } => walk(body, f),
                _ => {}
            }
        }
    }
    walk(&module.statements, &mut f);
}

/// Mutable counterpart of `walk_statements`, used by the optimizer passes
/// that rewrite statements in place.
pub fn walk_statements_mut<F: FnMut(&mut Statement)>(module: &mut Module, mut f: F) {
    fn walk<F: FnMut(&mut Statement)>(stmts: &mut [Statement], f: &mut F) {
        for s in stmts.iter_mut() {
            match s {
                Statement::Block(b) => walk(&mut b.statements, f),
                Statement::Subroutine(sub) => walk(&mut sub.statements, f),
                Statement::AnonymousScope(a) => walk(&mut a.statements, f),
                Statement::IfStatement {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    walk(then_branch, f);
                    walk(else_branch, f);
                }
                Statement::ForLoop { body, .. }
                | Statement::WhileLoop { body, .. }
                | Statement::RepeatLoop { body, .. } => walk(body, f),
                _ => {}
            }
            f(s);
        }
    }
    walk(&mut module.statements, &mut f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::position::Position;

    fn empty_block(id: u64, name: &str) -> Statement {
        Statement::Block(Block {
            id,
            name: name.to_string(),
            address: None,
            statements: vec![],
            force_output: false,
            position: Position::synthetic(),
        })
    }

    #[test]
    fn relink_maps_block_to_module_scope() {
        let module = Module {
            statements: vec![empty_block(1, "main")],
        };
        let map = relink(&module);
        assert_eq!(map.get(&1), Some(&MODULE_SCOPE));
    }

    #[test]
    fn relink_maps_nested_subroutine_to_its_block() {
        let sub = Subroutine {
            id: 2,
            name: "start".into(),
            params: vec![],
            returntypes: vec![],
            statements: vec![],
            is_asm_subroutine: false,
            asm_address: None,
            asm_parameter_registers: vec![],
            asm_returnvalues_registers: vec![],
            asm_clobbers: vec![],
            position: Position::synthetic(),
        };
        let module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::Subroutine(sub)],
                force_output: false,
                position: Position::synthetic(),
            })],
        };
        let map = relink(&module);
        assert_eq!(map.get(&2), Some(&1));
    }

    #[test]
    fn walk_statements_visits_nested_if_branches() {
        let module = Module {
            statements: vec![Statement::IfStatement {
                condition: crate::ast::Expr::Literal(crate::value::LiteralValue::ubyte(
                    1,
                    Position::synthetic(),
                )),
                then_branch: vec![Statement::nop(Position::synthetic())],
                else_branch: vec![Statement::nop(Position::synthetic())],
                position: Position::synthetic(),
            }],
        };
        let mut count = 0;
        walk_statements(&module, |_| count += 1);
        assert_eq!(count, 3);
    }
}
