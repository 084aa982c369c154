//! Lexical scope arena used by the checker to resolve identifiers.
//!
//! A `Namespace` is an arena of `Scope`s keyed by `ScopeId`, mirroring the
//! `NodeId`s on `Module`/`Block`/`Subroutine`/`AnonymousScope` (spec §3/§4.C).
//! Lookup walks the parent chain rather than flattening declarations into a
//! single global table, so a name declared in an inner scope can shadow an
//! outer one without the checker needing to track shadow/restore pairs.

use crate::ast::{Module, Statement, MODULE_SCOPE};
use crate::datatype::DataType;
use std::collections::HashMap;

pub type ScopeId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Var { dtype: DataType, constant: bool },
    Subroutine { params: Vec<DataType>, returns: Vec<DataType> },
    Block,
    Label,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: HashMap<String, Symbol>,
}

#[derive(Debug, Clone, Default)]
pub struct Namespace {
    scopes: HashMap<ScopeId, Scope>,
}

impl Namespace {
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(MODULE_SCOPE, Scope::default());
        Namespace { scopes }
    }

    pub fn declare_scope(&mut self, id: ScopeId, parent: ScopeId) {
        self.scopes.entry(id).or_insert(Scope {
            parent: Some(parent),
            symbols: HashMap::new(),
        });
    }

    /// Declares `name` in `scope`. Returns `false` without overwriting if the
    /// name already exists in that exact scope (the checker turns this into
    /// a "name already defined" error rather than silently shadowing within
    /// the same scope).
    pub fn declare(&mut self, scope: ScopeId, name: impl Into<String>, symbol: Symbol) -> bool {
        let name = name.into();
        let entry = self.scopes.entry(scope).or_default();
        if entry.symbols.contains_key(&name) {
            false
        } else {
            entry.symbols.insert(name, symbol);
            true
        }
    }

    /// Resolves `name` starting at `scope` and walking up through parents
    /// until `MODULE_SCOPE`'s own parent (`None`) is reached.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(sc) = self.scopes.get(&id) {
                if let Some(sym) = sc.symbols.get(name) {
                    return Some(sym);
                }
                current = sc.parent;
            } else {
                return None;
            }
        }
        None
    }

    /// True when `name` is declared directly in `scope`, ignoring parents;
    /// used for the "redeclaration in the same scope" check.
    pub fn declared_locally(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes
            .get(&scope)
            .map(|s| s.symbols.contains_key(name))
            .unwrap_or(false)
    }
}

/// Builds a `Namespace` from a module by walking every scope-introducing
/// node and declaring its direct children (vars, subroutines, blocks,
/// labels). Does not resolve expressions; that is the checker's job once
/// the namespace exists.
pub fn build_namespace(module: &Module) -> Namespace {
    let mut ns = Namespace::new();
    for stmt in &module.statements {
        index_statement(stmt, MODULE_SCOPE, &mut ns);
    }
    ns
}

fn index_statement(stmt: &Statement, scope: ScopeId, ns: &mut Namespace) {
    match stmt {
        Statement::Block(b) => {
            ns.declare(scope, &b.name, Symbol::Block);
            ns.declare_scope(b.id, scope);
            for s in &b.statements {
                index_statement(s, b.id, ns);
            }
        }
        Statement::Subroutine(sub) => {
            let params = sub.params.iter().map(|p| p.dtype).collect();
            ns.declare(
                scope,
                &sub.name,
                Symbol::Subroutine {
                    params,
                    returns: sub.returntypes.clone(),
                },
            );
            ns.declare_scope(sub.id, scope);
            for p in &sub.params {
                ns.declare(
                    sub.id,
                    &p.name,
                    Symbol::Var {
                        dtype: p.dtype,
                        constant: false,
                    },
                );
            }
            for s in &sub.statements {
                index_statement(s, sub.id, ns);
            }
        }
        Statement::AnonymousScope(a) => {
            ns.declare_scope(a.id, scope);
            for s in &a.statements {
                index_statement(s, a.id, ns);
            }
        }
        Statement::VarDecl(v) => {
            use crate::ast::VarDeclKind;
            ns.declare(
                scope,
                &v.name,
                Symbol::Var {
                    dtype: v.dtype,
                    constant: v.kind == VarDeclKind::Const,
                },
            );
        }
        Statement::Label { name, .. } => {
            ns.declare(scope, name, Symbol::Label);
        }
        Statement::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            for s in then_branch {
                index_statement(s, scope, ns);
            }
            for s in else_branch {
                index_statement(s, scope, ns);
            }
        }
        Statement::ForLoop { body, .. }
        | Statement::WhileLoop { body, .. }
        | Statement::RepeatLoop { body, .. } => {
            for s in body {
                index_statement(s, scope, ns);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, VarDecl, VarDeclKind};
    use crate::position::Position;

    #[test]
    fn inner_var_shadows_outer_without_error() {
        let mut ns = Namespace::new();
        ns.declare_scope(1, MODULE_SCOPE);
        ns.declare(
            MODULE_SCOPE,
            "x",
            Symbol::Var {
                dtype: DataType::UByte,
                constant: false,
            },
        );
        ns.declare(
            1,
            "x",
            Symbol::Var {
                dtype: DataType::Word,
                constant: false,
            },
        );
        assert_eq!(
            ns.resolve(1, "x"),
            Some(&Symbol::Var {
                dtype: DataType::Word,
                constant: false
            })
        );
        assert_eq!(
            ns.resolve(MODULE_SCOPE, "x"),
            Some(&Symbol::Var {
                dtype: DataType::UByte,
                constant: false
            })
        );
    }

    #[test]
    fn redeclaration_in_same_scope_is_rejected() {
        let mut ns = Namespace::new();
        assert!(ns.declare(
            MODULE_SCOPE,
            "x",
            Symbol::Var {
                dtype: DataType::UByte,
                constant: false
            }
        ));
        assert!(!ns.declare(
            MODULE_SCOPE,
            "x",
            Symbol::Var {
                dtype: DataType::Word,
                constant: false
            }
        ));
    }

    #[test]
    fn build_namespace_indexes_block_and_var() {
        let module = crate::ast::Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::VarDecl(VarDecl {
                    kind: VarDeclKind::Var,
                    dtype: DataType::UByte,
                    name: "counter".into(),
                    value: None,
                    arraysize: None,
                    zeropage: false,
                    position: Position::synthetic(),
                })],
                force_output: false,
                position: Position::synthetic(),
            })],
        };
        let ns = build_namespace(&module);
        assert!(ns.resolve(1, "counter").is_some());
        assert!(ns.resolve(MODULE_SCOPE, "main").is_some());
    }
}
