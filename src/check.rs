//! Semantic checker (spec §4.G).
//!
//! Runs after the optimizer has reached its fixed point (so the checker
//! only ever sees already-folded constants) and walks the whole module,
//! accumulating `CompileError`s into a `Diagnostics` rather than stopping at
//! the first problem. Declaration rules inject default initializers for
//! uninitialized `VAR`s directly into the AST as a side effect, since the IR
//! emitter assumes every variable has a `value`.

use crate::ast::{
    AssignTarget, Block, Expr, ForTarget, Module, Statement, Subroutine, VarDecl, VarDeclKind,
};
use crate::builtins;
use crate::datatype::DataType;
use crate::diagnostics::Diagnostics;
use crate::errors::CompileError;
use crate::heap::Heap;
use crate::namespace::{build_namespace, Namespace, Symbol};
use crate::position::Position;

pub struct Checker<'a> {
    namespace: Namespace,
    heap: &'a mut Heap,
    diagnostics: Diagnostics,
    /// True while walking statements inside a subroutine body; `Return` and
    /// bare `Jump` are only meaningful there.
    in_subroutine: bool,
    /// True while walking the single designated IRQ entrypoint subroutine,
    /// which is exempt from the "must return" rule (spec §4.G).
    in_irq_handler: bool,
}

/// Runs every rule in spec §4.G over `module`, mutating it in place to add
/// default initializers, and returns the accumulated diagnostics.
pub fn check_module(module: &mut Module, heap: &mut Heap) -> Diagnostics {
    let namespace = build_namespace(module);
    let mut checker = Checker {
        namespace,
        heap,
        diagnostics: Diagnostics::new(),
        in_subroutine: false,
        in_irq_handler: false,
    };
    checker.check_module_structure(module);
    for stmt in &mut module.statements {
        checker.check_toplevel(stmt);
    }
    checker.diagnostics
}

impl<'a> Checker<'a> {
    fn check_module_structure(&mut self, module: &Module) {
        let block_count = module
            .statements
            .iter()
            .filter(|s| matches!(s, Statement::Block(_)))
            .count();
        if block_count == 0 {
            self.diagnostics.error(CompileError::syntax(
                "a module must declare at least one block",
                Position::synthetic(),
            ));
        }
        let mut seen_names = std::collections::HashSet::new();
        for stmt in &module.statements {
            if let Statement::Block(b) = stmt {
                if !seen_names.insert(b.name.clone()) {
                    self.diagnostics.error(CompileError::name(
                        format!("block '{}' is declared more than once", b.name),
                        b.position.clone(),
                    ));
                }
            }
        }
    }

    fn check_toplevel(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Block(b) => self.check_block(b),
            Statement::Directive(d) => self.check_directive(d),
            _ => self.diagnostics.error(CompileError::syntax(
                "only blocks and directives may appear at module scope",
                stmt.position().clone(),
            )),
        }
    }

    fn check_block(&mut self, block: &mut Block) {
        if let Some(addr) = block.address {
            if addr == 0 {
                self.diagnostics.error(CompileError::syntax(
                    "a block's fixed address must not be zero",
                    block.position.clone(),
                ));
            }
        }
        for stmt in &mut block.statements {
            self.check_block_member(stmt);
        }
    }

    fn check_block_member(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Subroutine(sub) => self.check_subroutine(sub),
            Statement::VarDecl(v) => self.check_vardecl(v),
            Statement::Directive(d) => self.check_directive(d),
            Statement::Label { .. } => {}
            _ => self.diagnostics.error(CompileError::syntax(
                "only subroutines, variable declarations, labels and directives may appear in a block",
                stmt.position().clone(),
            )),
        }
    }

    fn check_subroutine(&mut self, sub: &mut Subroutine) {
        if sub.is_asm_subroutine {
            if sub.asm_address.is_none() && sub.statements.is_empty() {
                self.diagnostics.error(CompileError::syntax(
                    format!("asm subroutine '{}' has no address and no body", sub.name),
                    sub.position.clone(),
                ));
            }
            return;
        }

        let was_in_sub = self.in_subroutine;
        self.in_subroutine = true;
        for stmt in &mut sub.statements {
            self.check_statement(stmt, sub.id);
        }
        if !self.in_irq_handler && sub.returntypes.len() > 0 && !always_returns(&sub.statements) {
            self.diagnostics.error(CompileError::syntax(
                format!(
                    "subroutine '{}' does not return a value on all paths",
                    sub.name
                ),
                sub.position.clone(),
            ));
        }
        self.in_subroutine = was_in_sub;
    }

    fn check_directive(&mut self, directive: &crate::ast::Directive) {
        const KNOWN: &[&str] = &["output", "launcher", "zeropage", "import", "option"];
        if !KNOWN.contains(&directive.name.as_str()) {
            self.diagnostics.error(CompileError::syntax(
                format!("unknown directive '%{}'", directive.name),
                directive.position.clone(),
            ));
        }
        if directive.name == "import" {
            if let Some(crate::ast::DirectiveArg::Name(target)) = directive.args.first() {
                if target == "self" {
                    self.diagnostics.error(CompileError::name(
                        "a module cannot import itself",
                        directive.position.clone(),
                    ));
                }
            }
        }
    }

    fn check_vardecl(&mut self, v: &mut VarDecl) {
        if v.kind == VarDeclKind::Const && v.value.is_none() {
            self.diagnostics.error(CompileError::syntax(
                format!("constant '{}' must have an initializer", v.name),
                v.position.clone(),
            ));
            return;
        }
        if v.kind != VarDeclKind::Const && v.value.is_none() {
            v.value = Some(self.default_initializer(v.dtype, v.position.clone()));
        }
        if let Some(size_expr) = &v.arraysize {
            if let Some(lit) = size_expr.as_literal() {
                let requested = lit.as_integer_value().unwrap_or(0);
                if let Some(max) = v.dtype.array_max_elements() {
                    if requested < 1 || requested as usize > max {
                        self.diagnostics.error(CompileError::expression(
                            format!(
                                "array size {} is out of range for {} (1..={})",
                                requested, v.dtype, max
                            ),
                            v.position.clone(),
                        ));
                    }
                }
            }
        }
        if v.zeropage && v.dtype.is_on_heap() {
            self.diagnostics.error(CompileError::syntax(
                format!("'{}' cannot be placed in zero page: heap-backed types are not zero-page eligible", v.name),
                v.position.clone(),
            ));
        }
    }

    fn default_initializer(&mut self, dtype: DataType, position: Position) -> Expr {
        let literal = match dtype {
            DataType::UByte => crate::value::LiteralValue::ubyte(0, position),
            DataType::Byte => crate::value::LiteralValue::byte(0, position),
            DataType::UWord => crate::value::LiteralValue::uword(0, position),
            DataType::Word => crate::value::LiteralValue::word(0, position),
            DataType::Float => crate::value::LiteralValue::float(0.0, position),
            DataType::Str | DataType::StrS => {
                let id = self.heap.string_sentinel();
                crate::value::LiteralValue::heap(dtype, id, position)
            }
            _ => crate::value::LiteralValue::uword(0, position),
        };
        Expr::Literal(literal)
    }

    fn check_statement(&mut self, stmt: &mut Statement, scope: u64) {
        match stmt {
            Statement::VarDecl(v) => self.check_vardecl(v),
            Statement::Assignment(a) => self.check_assignment(a, scope),
            Statement::IfStatement {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition, scope);
                for s in then_branch {
                    self.check_statement(s, scope);
                }
                for s in else_branch {
                    self.check_statement(s, scope);
                }
            }
            Statement::ForLoop {
                loopvar,
                iterable,
                body,
                position,
            } => {
                self.check_expr(iterable, scope);
                let elem_dtype = self.check_for_iterable(iterable, scope, position);
                if let ForTarget::Variable(name) = loopvar {
                    match self.namespace.resolve(scope, name) {
                        None => self.diagnostics.error(CompileError::name(
                            format!("undeclared loop variable '{}'", name),
                            position.clone(),
                        )),
                        Some(Symbol::Var { dtype: var_dtype, .. }) => {
                            let var_dtype = *var_dtype;
                            if let Some(elem) = elem_dtype {
                                if !loop_types_compatible(var_dtype, elem) {
                                    self.diagnostics.error(CompileError::expression(
                                        format!(
                                            "loop variable '{}' of type {} cannot iterate over {}",
                                            name, var_dtype, elem
                                        ),
                                        position.clone(),
                                    ));
                                }
                            }
                        }
                        Some(_) => {}
                    }
                }
                for s in body {
                    self.check_statement(s, scope);
                }
            }
            Statement::WhileLoop { condition, body, .. } => {
                self.check_expr(condition, scope);
                for s in body {
                    self.check_statement(s, scope);
                }
            }
            Statement::RepeatLoop { body, until, .. } => {
                for s in body {
                    self.check_statement(s, scope);
                }
                self.check_expr(until, scope);
            }
            Statement::Return { values, position } => {
                if !self.in_subroutine {
                    self.diagnostics.error(CompileError::syntax(
                        "return statement outside of a subroutine",
                        position.clone(),
                    ));
                }
                for v in values {
                    self.check_expr(v, scope);
                }
            }
            Statement::Jump { target, position } => {
                if self.namespace.resolve(scope, target).is_none() {
                    self.diagnostics.error(CompileError::name(
                        format!("jump target '{}' is not declared", target),
                        position.clone(),
                    ));
                }
            }
            Statement::PostIncrDecr { target, .. } => self.check_assign_target(target, scope),
            Statement::FunctionCallStatement {
                target,
                args,
                position,
            } => self.check_call(target, args, scope, position),
            Statement::BuiltinFunctionStatementPlaceholder {
                name,
                args,
                position,
            } => self.check_call(name, args, scope, position),
            Statement::InlineAssembly { .. } | Statement::Label { .. } | Statement::NopStatement { .. } => {}
            Statement::Subroutine(sub) => self.check_subroutine(sub),
            Statement::Block(b) => self.check_block(b),
            Statement::AnonymousScope(a) => {
                for s in &mut a.statements {
                    self.check_statement(s, scope);
                }
            }
            Statement::Directive(d) => self.check_directive(d),
        }
    }

    fn check_assignment(&mut self, a: &mut crate::ast::Assignment, scope: u64) {
        self.check_expr(&mut a.value, scope);
        for t in &a.targets {
            self.check_assign_target(t, scope);
        }
        if a.targets.len() == 1 {
            if let AssignTarget::Identifier { name, position } = &a.targets[0] {
                if let Some(Symbol::Var { constant: true, .. }) = self.namespace.resolve(scope, name) {
                    self.diagnostics.error(CompileError::name(
                        format!("cannot assign to constant '{}'", name),
                        position.clone(),
                    ));
                }
            }
        }
    }

    fn check_assign_target(&mut self, target: &AssignTarget, scope: u64) {
        match target {
            AssignTarget::Identifier { name, position } => {
                if self.namespace.resolve(scope, name).is_none() {
                    self.diagnostics.error(CompileError::name(
                        format!("undeclared identifier '{}'", name),
                        position.clone(),
                    ));
                }
            }
            AssignTarget::Indexed { name, position, .. } => {
                if self.namespace.resolve(scope, name).is_none() {
                    self.diagnostics.error(CompileError::name(
                        format!("undeclared identifier '{}'", name),
                        position.clone(),
                    ));
                }
            }
            AssignTarget::Register(_) | AssignTarget::Memory { .. } => {}
        }
    }

    fn check_call(&mut self, target: &str, args: &mut [Expr], scope: u64, position: &Position) {
        for a in args.iter_mut() {
            self.check_expr(a, scope);
        }
        let arg_types: Vec<DataType> = args.iter().filter_map(|a| self.expr_dtype(a, scope)).collect();
        let is_builtin = builtins::lookup(target).is_some();
        let is_user_sub = matches!(self.namespace.resolve(scope, target), Some(Symbol::Subroutine { .. }));
        if !is_builtin && !is_user_sub {
            self.diagnostics.error(CompileError::name(
                format!("call to undeclared subroutine or builtin '{}'", target),
                position.clone(),
            ));
        } else if is_builtin && arg_types.len() == args.len() && !builtins::arity_and_types_match(target, &arg_types) {
            self.diagnostics.error(CompileError::expression(
                format!("arguments do not match the signature of '{}'", target),
                position.clone(),
            ));
        }
    }

    fn check_expr(&mut self, expr: &mut Expr, scope: u64) {
        match expr {
            Expr::Identifier { name, position } => {
                if self.namespace.resolve(scope, name).is_none() {
                    self.diagnostics.error(CompileError::name(
                        format!("undeclared identifier '{}'", name),
                        position.clone(),
                    ));
                }
            }
            Expr::Prefix { inner, .. } => self.check_expr(inner, scope),
            Expr::Binary { left, op, right, position } => {
                self.check_expr(left, scope);
                self.check_expr(right, scope);
                if let (Some(lt), Some(rt)) = (self.expr_dtype(left, scope), self.expr_dtype(right, scope)) {
                    if op.is_bitwise() || op.is_shift() {
                        if !lt.is_integer() || !rt.is_integer() {
                            self.diagnostics.error(CompileError::expression(
                                format!("operator '{}' requires integer operands", op.as_str()),
                                position.clone(),
                            ));
                        }
                    } else if !op.is_logical() && (!lt.is_numeric() && !lt.is_string() || !rt.is_numeric() && !rt.is_string()) {
                        self.diagnostics.error(CompileError::expression(
                            format!("operator '{}' is not defined for {} and {}", op.as_str(), lt, rt),
                            position.clone(),
                        ));
                    }
                }
            }
            Expr::FunctionCall { target, args, position } => {
                let position = position.clone();
                self.check_call(target, args, scope, &position);
            }
            Expr::ArrayIndexed { name, index, position } => {
                self.check_expr(index, scope);
                match self.namespace.resolve(scope, name) {
                    None => self.diagnostics.error(CompileError::name(
                        format!("undeclared identifier '{}'", name),
                        position.clone(),
                    )),
                    Some(Symbol::Var { dtype, .. }) if !dtype.is_array() && !dtype.is_string() => {
                        self.diagnostics.error(CompileError::expression(
                            format!("'{}' cannot be indexed: not an array or string", name),
                            position.clone(),
                        ));
                    }
                    _ => {}
                }
            }
            Expr::AddressOf { name, position, .. } => {
                if self.namespace.resolve(scope, name).is_none() {
                    self.diagnostics.error(CompileError::name(
                        format!("undeclared identifier '{}'", name),
                        position.clone(),
                    ));
                }
            }
            Expr::Typecast { value, .. } => self.check_expr(value, scope),
            Expr::Range { from, to, step, position } => {
                self.check_expr(from, scope);
                self.check_expr(to, scope);
                if let Some(s) = step {
                    self.check_expr(s, scope);
                }
                self.check_range_bounds(from, to, step.as_deref(), position);
            }
            Expr::DirectMemoryRead { addr, .. } => self.check_expr(addr, scope),
            Expr::Literal(_) | Expr::RegisterExpr { .. } => {}
        }
    }

    /// Best-effort dtype of an expression without re-evaluating it: a
    /// literal's own type, or a resolved variable's declared type. Anything
    /// else (calls, indexing, etc.) is `None` rather than guessed at.
    fn expr_dtype(&self, expr: &Expr, scope: u64) -> Option<DataType> {
        match expr {
            Expr::Literal(v) => Some(v.dtype),
            Expr::Identifier { name, .. } => match self.namespace.resolve(scope, name) {
                Some(Symbol::Var { dtype, .. }) => Some(*dtype),
                _ => None,
            },
            _ => None,
        }
    }

    /// Enforces the "range" rule (spec §4.G): endpoints must be constant;
    /// an ascending range requires a positive step and a descending one a
    /// negative step; a character range's endpoints must both be single
    /// characters.
    fn check_range_bounds(&mut self, from: &Expr, to: &Expr, step: Option<&Expr>, position: &Position) {
        let (Expr::Literal(f), Expr::Literal(t)) = (from, to) else {
            self.diagnostics.error(CompileError::expression(
                "range endpoints must be constant",
                position.clone(),
            ));
            return;
        };

        if f.dtype.is_string() != t.dtype.is_string() {
            self.diagnostics.error(CompileError::expression(
                "a character range's endpoints must both be strings",
                position.clone(),
            ));
            return;
        }
        if f.dtype.is_string() {
            let single_char = |lit: &crate::value::LiteralValue| {
                lit.heap_id()
                    .and_then(|id| self.heap.get(id))
                    .map(|e| matches!(e, crate::heap::HeapEntry::Str { value, .. } if value.chars().count() == 1))
                    .unwrap_or(false)
            };
            if !single_char(f) || !single_char(t) {
                self.diagnostics.error(CompileError::expression(
                    "character range endpoints must be single characters",
                    position.clone(),
                ));
            }
            return;
        }

        let (Some(fv), Some(tv)) = (f.as_integer_value(), t.as_integer_value()) else {
            return;
        };
        if let Some(Expr::Literal(s)) = step {
            if let Some(sv) = s.as_integer_value() {
                if sv == 0 {
                    self.diagnostics.error(CompileError::expression(
                        "range step must not be zero",
                        position.clone(),
                    ));
                } else if tv > fv && sv < 0 {
                    self.diagnostics.error(CompileError::expression(
                        "an ascending range requires a positive step",
                        position.clone(),
                    ));
                } else if tv < fv && sv > 0 {
                    self.diagnostics.error(CompileError::expression(
                        "a descending range requires a negative step",
                        position.clone(),
                    ));
                }
            }
        }
    }

    /// Resolves the element type a `for` loop's iterable yields per
    /// iteration, and flags non-iterable iterables (spec §4.G: "iterable
    /// must be an iterable type"). Strings yield UBYTE character codes, per
    /// the same per-character model the `petscii`/builtin table uses.
    fn check_for_iterable(&mut self, iterable: &Expr, scope: u64, position: &Position) -> Option<DataType> {
        match iterable {
            Expr::Range { from, .. } => match from.as_ref() {
                Expr::Literal(v) => Some(v.dtype),
                _ => None,
            },
            other => match self.expr_dtype(other, scope) {
                Some(d) if d.is_iterable() => {
                    if d.is_string() {
                        Some(DataType::UByte)
                    } else {
                        d.array_element_type()
                    }
                }
                Some(d) => {
                    self.diagnostics.error(CompileError::expression(
                        format!("cannot iterate over {}", d),
                        position.clone(),
                    ));
                    None
                }
                None => None,
            },
        }
    }
}

fn loop_types_compatible(var_dtype: DataType, elem: DataType) -> bool {
    if var_dtype == elem {
        return true;
    }
    match (var_dtype.integer_range(), elem.integer_range()) {
        (Some((vlo, vhi)), Some((elo, ehi))) => vlo <= elo && ehi <= vhi,
        _ => false,
    }
}

/// Conservative reachability check: true if every path through `stmts`
/// ends in a `Return`. Used only to flag subroutines with a declared
/// return type that can fall off the end; does not need to be exhaustive
/// about unreachable code.
fn always_returns(stmts: &[Statement]) -> bool {
    match stmts.last() {
        Some(Statement::Return { .. }) => true,
        Some(Statement::IfStatement {
            then_branch,
            else_branch,
            ..
        }) => {
            !else_branch.is_empty() && always_returns(then_branch) && always_returns(else_branch)
        }
        Some(Statement::RepeatLoop { .. }) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, VarDecl};
    use crate::position::Position;

    fn pos() -> Position {
        Position::synthetic()
    }

    #[test]
    fn flags_undeclared_identifier() {
        let mut module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::Assignment(crate::ast::Assignment {
                    targets: vec![AssignTarget::Identifier {
                        name: "nope".into(),
                        position: pos(),
                    }],
                    aug_op: None,
                    value: Expr::Literal(crate::value::LiteralValue::ubyte(1, pos())),
                    position: pos(),
                })],
                force_output: false,
                position: pos(),
            })],
        };
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn injects_default_initializer_for_uninitialized_var() {
        let mut module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::VarDecl(VarDecl {
                    kind: VarDeclKind::Var,
                    dtype: DataType::UByte,
                    name: "x".into(),
                    value: None,
                    arraysize: None,
                    zeropage: false,
                    position: pos(),
                })],
                force_output: false,
                position: pos(),
            })],
        };
        let mut heap = Heap::new();
        check_module(&mut module, &mut heap);
        match &module.statements[0] {
            Statement::Block(b) => match &b.statements[0] {
                Statement::VarDecl(v) => assert!(v.value.is_some()),
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn rejects_const_without_initializer() {
        let mut module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::VarDecl(VarDecl {
                    kind: VarDeclKind::Const,
                    dtype: DataType::UByte,
                    name: "X".into(),
                    value: None,
                    arraysize: None,
                    zeropage: false,
                    position: pos(),
                })],
                force_output: false,
                position: pos(),
            })],
        };
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn rejects_module_with_no_blocks() {
        let mut module = Module { statements: vec![] };
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn rejects_self_import() {
        let mut module = Module {
            statements: vec![
                Statement::Directive(crate::ast::Directive {
                    name: "import".into(),
                    args: vec![crate::ast::DirectiveArg::Name("self".into())],
                    position: pos(),
                }),
                Statement::Block(Block {
                    id: 1,
                    name: "main".into(),
                    address: None,
                    statements: vec![],
                    force_output: false,
                    position: pos(),
                }),
            ],
        };
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    fn for_loop_module(loopvar_dtype: DataType, iterable: Expr) -> Module {
        Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![
                    Statement::VarDecl(VarDecl {
                        kind: VarDeclKind::Var,
                        dtype: loopvar_dtype,
                        name: "i".into(),
                        value: None,
                        arraysize: None,
                        zeropage: false,
                        position: pos(),
                    }),
                    Statement::ForLoop {
                        loopvar: ForTarget::Variable("i".into()),
                        iterable,
                        body: vec![],
                        position: pos(),
                    },
                ],
                force_output: false,
                position: pos(),
            })],
        }
    }

    #[test]
    fn rejects_a_non_constant_range_endpoint() {
        let mut module = for_loop_module(
            DataType::UByte,
            Expr::Range {
                from: Box::new(Expr::Identifier { name: "i".into(), position: pos() }),
                to: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(5, pos()))),
                step: None,
                position: pos(),
            },
        );
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn rejects_descending_range_with_a_positive_step() {
        let mut module = for_loop_module(
            DataType::UByte,
            Expr::Range {
                from: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(10, pos()))),
                to: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(1, pos()))),
                step: Some(Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(1, pos())))),
                position: pos(),
            },
        );
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn accepts_a_well_formed_ascending_range() {
        let mut module = for_loop_module(
            DataType::UByte,
            Expr::Range {
                from: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(1, pos()))),
                to: Box::new(Expr::Literal(crate::value::LiteralValue::ubyte(10, pos()))),
                step: None,
                position: pos(),
            },
        );
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(!diags.has_errors());
    }

    #[test]
    fn rejects_a_multi_character_string_range_endpoint() {
        let mut heap = Heap::new();
        let id = heap.alloc_string("ab".into(), false);
        let mut module = for_loop_module(
            DataType::UByte,
            Expr::Range {
                from: Box::new(Expr::Literal(crate::value::LiteralValue::heap(
                    DataType::Str,
                    id,
                    pos(),
                ))),
                to: Box::new(Expr::Literal(crate::value::LiteralValue::heap(
                    DataType::Str,
                    id,
                    pos(),
                ))),
                step: None,
                position: pos(),
            },
        );
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }

    #[test]
    fn rejects_for_loop_over_a_non_iterable_value() {
        let mut module = for_loop_module(
            DataType::UByte,
            Expr::Literal(crate::value::LiteralValue::ubyte(5, pos())),
        );
        let mut heap = Heap::new();
        let diags = check_module(&mut module, &mut heap);
        assert!(diags.has_errors());
    }
}
