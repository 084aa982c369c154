//! Abstract syntax tree for the Dragonforge language.
//!
//! Node variants are owned, not reference-counted: a rewrite returns a
//! replacement node and the caller substitutes it in place (spec §3
//! Lifecycle). `parent` relationships are *not* maintained incrementally as
//! live back-pointers (design note 4.9: "do not attempt to maintain
//! back-references incrementally"); instead `visit::relink` derives a
//! `ParentMap` from the current tree shape whenever a pass needs to walk
//! upward (scope resolution, diagnostics). Scope-introducing nodes
//! (`Module`, `Block`, `Subroutine`, `AnonymousScope`) carry a `NodeId` that
//! the parent map is keyed on.

use crate::datatype::DataType;
use crate::heap::HeapId;
use crate::position::Position;
use crate::value::LiteralValue;
use serde::{Deserialize, Serialize};

pub type NodeId = u64;

/// The id of the implicit root scope that every parent chain terminates at.
pub const MODULE_SCOPE: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    A,
    X,
    Y,
    Ax,
    Ay,
    Xy,
    /// Carry / zero / negative status flags, usable as single-bit asm
    /// return values or parameters.
    Carry,
    Zero,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixOp {
    Plus,
    Neg,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncrDecrOp {
    Incr,
    Decr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(LiteralValue),
    Identifier {
        name: String,
        position: Position,
    },
    Prefix {
        op: PrefixOp,
        inner: Box<Expr>,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        position: Position,
    },
    FunctionCall {
        target: String,
        args: Vec<Expr>,
        position: Position,
    },
    ArrayIndexed {
        name: String,
        index: Box<Expr>,
        position: Position,
    },
    AddressOf {
        name: String,
        /// Set by the resolver before IR emission; absence at that point is
        /// an `AstException` (spec §3 invariant).
        scopedname: Option<String>,
        position: Position,
    },
    Typecast {
        value: Box<Expr>,
        dtype: DataType,
        position: Position,
    },
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        step: Option<Box<Expr>>,
        position: Position,
    },
    RegisterExpr {
        register: Register,
        position: Position,
    },
    DirectMemoryRead {
        addr: Box<Expr>,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> &Position {
        match self {
            Expr::Literal(v) => &v.position,
            Expr::Identifier { position, .. }
            | Expr::Prefix { position, .. }
            | Expr::Binary { position, .. }
            | Expr::FunctionCall { position, .. }
            | Expr::ArrayIndexed { position, .. }
            | Expr::AddressOf { position, .. }
            | Expr::Typecast { position, .. }
            | Expr::Range { position, .. }
            | Expr::RegisterExpr { position, .. }
            | Expr::DirectMemoryRead { position, .. } => position,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarDeclKind {
    Var,
    Const,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: VarDeclKind,
    pub dtype: DataType,
    pub name: String,
    pub value: Option<Expr>,
    pub arraysize: Option<Expr>,
    pub zeropage: bool,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Register(Register),
    Identifier { name: String, position: Position },
    Indexed {
        name: String,
        index: Expr,
        position: Position,
    },
    Memory { addr: Expr, position: Position },
}

impl AssignTarget {
    /// Structural equality used by the redundant-store optimization rule
    /// (spec §4.F): two targets are "the same" when they are syntactically
    /// identical, not merely type-compatible.
    pub fn structurally_equal(&self, other: &AssignTarget) -> bool {
        match (self, other) {
            (AssignTarget::Register(a), AssignTarget::Register(b)) => a == b,
            (
                AssignTarget::Identifier { name: a, .. },
                AssignTarget::Identifier { name: b, .. },
            ) => a == b,
            (
                AssignTarget::Indexed {
                    name: n1,
                    index: i1,
                    ..
                },
                AssignTarget::Indexed {
                    name: n2,
                    index: i2,
                    ..
                },
            ) => n1 == n2 && exprs_structurally_equal(i1, i2),
            (AssignTarget::Memory { addr: a1, .. }, AssignTarget::Memory { addr: a2, .. }) => {
                exprs_structurally_equal(a1, a2)
            }
            _ => false,
        }
    }
}

/// Structural (not value) equality for two expressions, ignoring position.
/// Literal comparisons delegate to numeric/heap-id equality.
pub fn exprs_structurally_equal(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (Expr::Literal(x), Expr::Literal(y)) => x.bits == y.bits && x.dtype == y.dtype,
        (Expr::Identifier { name: n1, .. }, Expr::Identifier { name: n2, .. }) => n1 == n2,
        (
            Expr::Binary {
                left: l1,
                op: o1,
                right: r1,
                ..
            },
            Expr::Binary {
                left: l2,
                op: o2,
                right: r2,
                ..
            },
        ) => o1 == o2 && exprs_structurally_equal(l1, l2) && exprs_structurally_equal(r1, r2),
        (
            Expr::ArrayIndexed {
                name: n1,
                index: i1,
                ..
            },
            Expr::ArrayIndexed {
                name: n2,
                index: i2,
                ..
            },
        ) => n1 == n2 && exprs_structurally_equal(i1, i2),
        (Expr::RegisterExpr { register: r1, .. }, Expr::RegisterExpr { register: r2, .. }) => {
            r1 == r2
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub targets: Vec<AssignTarget>,
    /// `Some(op)` before desugaring (`x += v`); desugared in place to a
    /// plain assignment with `value = x op v` by the checker (spec §4.G).
    pub aug_op: Option<BinOp>,
    pub value: Expr,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub dtype: DataType,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsmRegisterSpec {
    pub register: Register,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subroutine {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<Param>,
    pub returntypes: Vec<DataType>,
    pub statements: Vec<Statement>,
    pub is_asm_subroutine: bool,
    pub asm_address: Option<u32>,
    pub asm_parameter_registers: Vec<AsmRegisterSpec>,
    pub asm_returnvalues_registers: Vec<AsmRegisterSpec>,
    pub asm_clobbers: Vec<Register>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub name: String,
    pub address: Option<u32>,
    pub statements: Vec<Statement>,
    pub force_output: bool,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForTarget {
    Variable(String),
    Register(Register),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirectiveArg {
    Name(String),
    Number(i64),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub args: Vec<DirectiveArg>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousScope {
    pub id: NodeId,
    pub statements: Vec<Statement>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block(Block),
    Subroutine(Subroutine),
    VarDecl(VarDecl),
    Assignment(Assignment),
    Jump {
        target: String,
        position: Position,
    },
    Return {
        values: Vec<Expr>,
        position: Position,
    },
    IfStatement {
        condition: Expr,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
        position: Position,
    },
    ForLoop {
        loopvar: ForTarget,
        iterable: Expr,
        body: Vec<Statement>,
        position: Position,
    },
    WhileLoop {
        condition: Expr,
        body: Vec<Statement>,
        position: Position,
    },
    RepeatLoop {
        body: Vec<Statement>,
        until: Expr,
        position: Position,
    },
    Label {
        name: String,
        position: Position,
    },
    PostIncrDecr {
        target: AssignTarget,
        op: IncrDecrOp,
        position: Position,
    },
    FunctionCallStatement {
        target: String,
        args: Vec<Expr>,
        position: Position,
    },
    InlineAssembly {
        code: String,
        position: Position,
    },
    Directive(Directive),
    AnonymousScope(AnonymousScope),
    NopStatement {
        position: Position,
    },
    BuiltinFunctionStatementPlaceholder {
        name: String,
        args: Vec<Expr>,
        position: Position,
    },
}

impl Statement {
    pub fn position(&self) -> &Position {
        match self {
            Statement::Block(b) => &b.position,
            Statement::Subroutine(s) => &s.position,
            Statement::VarDecl(v) => &v.position,
            Statement::Assignment(a) => &a.position,
            Statement::Jump { position, .. }
            | Statement::Return { position, .. }
            | Statement::IfStatement { position, .. }
            | Statement::ForLoop { position, .. }
            | Statement::WhileLoop { position, .. }
            | Statement::RepeatLoop { position, .. }
            | Statement::Label { position, .. }
            | Statement::PostIncrDecr { position, .. }
            | Statement::FunctionCallStatement { position, .. }
            | Statement::InlineAssembly { position, .. }
            | Statement::NopStatement { position }
            | Statement::BuiltinFunctionStatementPlaceholder { position, .. } => position,
            Statement::Directive(d) => &d.position,
            Statement::AnonymousScope(a) => &a.position,
        }
    }

    pub fn is_empty_scope(&self) -> bool {
        match self {
            Statement::Block(b) => b.statements.is_empty(),
            Statement::Subroutine(s) => s.statements.is_empty(),
            Statement::AnonymousScope(a) => a.statements.is_empty(),
            _ => false,
        }
    }

    pub fn nop(position: Position) -> Statement {
        Statement::NopStatement { position }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub statements: Vec<Statement>,
}

impl Module {
    pub fn new() -> Self {
        Module {
            statements: Vec::new(),
        }
    }

    pub fn find_block(&self, name: &str) -> Option<&Block> {
        self.statements.iter().find_map(|s| match s {
            Statement::Block(b) if b.name == name => Some(b),
            _ => None,
        })
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder id for nodes created before a live `HeapId` is assigned by
/// the value model; used only in test fixtures.
pub const NO_HEAP: HeapId = usize::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_position() {
        let a = AssignTarget::Identifier {
            name: "x".into(),
            position: Position::new("f", 1, 1),
        };
        let b = AssignTarget::Identifier {
            name: "x".into(),
            position: Position::new("f", 99, 9),
        };
        assert!(a.structurally_equal(&b));
    }

    #[test]
    fn structural_equality_distinguishes_indices() {
        let a = AssignTarget::Indexed {
            name: "arr".into(),
            index: Expr::Literal(LiteralValue::ubyte(0, Position::synthetic())),
            position: Position::synthetic(),
        };
        let b = AssignTarget::Indexed {
            name: "arr".into(),
            index: Expr::Literal(LiteralValue::ubyte(1, Position::synthetic())),
            position: Position::synthetic(),
        };
        assert!(!a.structurally_equal(&b));
    }

    #[test]
    fn find_block_locates_by_name() {
        let module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![],
                force_output: false,
                position: Position::synthetic(),
            })],
        };
        assert!(module.find_block("main").is_some());
        assert!(module.find_block("other").is_none());
    }
}
