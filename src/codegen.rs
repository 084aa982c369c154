//! IR emitter (spec §4.H).
//!
//! Lowers a checked, fixed-point-optimized `Module` into a `ir::Program`.
//! Mirrors the teacher compiler's `CodeGen` shape: a struct holding
//! monotonically increasing counters for synthesized labels, plus a
//! zero-page allocation pass run once per block before instructions are
//! emitted. After emission, an idempotent peephole pass removes
//! consecutive `Nop`s (spec §4.H "peephole optimization").

use crate::ast::{
    AssignTarget, Assignment, BinOp, Block, Expr, ForTarget, IncrDecrOp, Module, PrefixOp,
    Statement, Subroutine, VarDeclKind,
};
use crate::diagnostics::Diagnostics;
use crate::errors::{CompilerException, ZeropageDepletedError};
use crate::ir::{Instruction, InstructionArg, Opcode, Program, ProgramBlock};
use crate::zeropage::{SimpleZeropageAllocator, ZeropageAllocator, ZeropageMode};

pub struct CodeGen {
    label_counter: u32,
    zeropage_mode: ZeropageMode,
}

impl CodeGen {
    pub fn new(zeropage_mode: ZeropageMode) -> Self {
        CodeGen {
            label_counter: 0,
            zeropage_mode,
        }
    }

    fn next_label(&mut self, hint: &str) -> String {
        let label = format!("_{hint}_{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Emits IR for `module`, recording zero-page exhaustion as a warning
    /// on `diagnostics` rather than failing the whole pass (spec §7).
    pub fn emit(&mut self, module: &Module, diagnostics: &mut Diagnostics) -> Program {
        let mut program = Program::default();
        for stmt in &module.statements {
            if let Statement::Block(block) = stmt {
                program.blocks.push(self.emit_block(block, diagnostics));
            }
        }
        program
    }

    fn emit_block(&mut self, block: &Block, diagnostics: &mut Diagnostics) -> ProgramBlock {
        let mut out = ProgramBlock::new(block.name.clone());
        out.address = block.address;
        out.force_output = block.force_output;

        let mut allocator = SimpleZeropageAllocator::new(self.zeropage_mode);
        for stmt in &block.statements {
            self.allocate_zeropage(stmt, &mut allocator, diagnostics);
        }

        for stmt in &block.statements {
            self.emit_statement(stmt, &mut out);
        }
        peephole_optimize(&mut out);
        out
    }

    fn allocate_zeropage(
        &mut self,
        stmt: &Statement,
        allocator: &mut SimpleZeropageAllocator,
        diagnostics: &mut Diagnostics,
    ) {
        if let Statement::VarDecl(v) = stmt {
            if v.zeropage {
                let size = if v.dtype.is_word() { 2 } else { 1 };
                if allocator.allocate(size).is_none() {
                    diagnostics.warn(
                        ZeropageDepletedError {
                            variable: v.name.clone(),
                        }
                        .to_string(),
                        v.position.clone(),
                    );
                }
            }
        }
    }

    fn emit_statement(&mut self, stmt: &Statement, out: &mut ProgramBlock) {
        match stmt {
            Statement::VarDecl(v) => {
                out.variables.push(v.name.clone());
                if v.kind != VarDeclKind::Const {
                    if let Some(value) = &v.value {
                        self.emit_expr(value, out);
                        out.push(
                            Instruction::new(Opcode::StoreVar)
                                .with_arg(InstructionArg::Name(v.name.clone())),
                        );
                    }
                }
            }
            Statement::Assignment(assignment) => self.emit_assignment(assignment, out),
            Statement::IfStatement {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.emit_if(condition, then_branch, else_branch, out),
            Statement::WhileLoop { condition, body, .. } => self.emit_while(condition, body, out),
            Statement::RepeatLoop { body, until, .. } => self.emit_repeat(body, until, out),
            Statement::ForLoop {
                loopvar,
                iterable,
                body,
                ..
            } => self.emit_for(loopvar, iterable, body, out),
            Statement::Return { values, .. } => {
                for v in values {
                    self.emit_expr(v, out);
                }
                out.push(Instruction::new(Opcode::Return));
            }
            Statement::Jump { target, .. } => {
                out.push(Instruction::new(Opcode::Jump).with_label(target.clone()));
            }
            Statement::Label { name, .. } => out.label(name.clone()),
            Statement::PostIncrDecr { target, op, .. } => self.emit_incr_decr(target, *op, out),
            Statement::FunctionCallStatement { target, args, .. }
            | Statement::BuiltinFunctionStatementPlaceholder { name: target, args, .. } => {
                for a in args {
                    self.emit_expr(a, out);
                }
                out.push(Instruction::new(Opcode::Call).with_label(target.clone()));
            }
            Statement::InlineAssembly { code, .. } => {
                out.push(Instruction::new(Opcode::Nop).with_arg(InstructionArg::Name(code.clone())));
            }
            Statement::Subroutine(sub) => self.emit_subroutine(sub, out),
            Statement::NopStatement { .. } => out.push(Instruction::new(Opcode::Nop)),
            Statement::AnonymousScope(scope) => {
                for s in &scope.statements {
                    self.emit_statement(s, out);
                }
            }
            Statement::Directive(_) | Statement::Block(_) => {
                CompilerException::fail("directives and nested blocks must not reach codegen")
            }
        }
    }

    fn emit_subroutine(&mut self, sub: &Subroutine, out: &mut ProgramBlock) {
        out.label(sub.name.clone());
        for stmt in &sub.statements {
            self.emit_statement(stmt, out);
        }
    }

    fn emit_assignment(&mut self, assignment: &Assignment, out: &mut ProgramBlock) {
        self.emit_expr(&assignment.value, out);
        for target in assignment.targets.iter().rev() {
            self.emit_store(target, out);
        }
    }

    fn emit_store(&mut self, target: &AssignTarget, out: &mut ProgramBlock) {
        match target {
            AssignTarget::Identifier { name, .. } => {
                out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(name.clone())));
            }
            AssignTarget::Indexed { name, index, .. } => {
                self.emit_expr(index, out);
                out.push(Instruction::new(Opcode::StoreIndexed).with_arg(InstructionArg::Name(name.clone())));
            }
            AssignTarget::Register(reg) => {
                out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(format!("{reg:?}"))));
            }
            AssignTarget::Memory { addr, .. } => {
                self.emit_expr(addr, out);
                out.push(Instruction::new(Opcode::StoreVar));
            }
        }
    }

    fn emit_incr_decr(&mut self, target: &AssignTarget, op: IncrDecrOp, out: &mut ProgramBlock) {
        self.emit_load(target, out);
        out.push(Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Int(1)));
        out.push(Instruction::new(match op {
            IncrDecrOp::Incr => Opcode::Add,
            IncrDecrOp::Decr => Opcode::Sub,
        }));
        self.emit_store(target, out);
    }

    fn emit_load(&mut self, target: &AssignTarget, out: &mut ProgramBlock) {
        match target {
            AssignTarget::Identifier { name, .. } => {
                out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(name.clone())));
            }
            AssignTarget::Indexed { name, index, .. } => {
                self.emit_expr(index, out);
                out.push(Instruction::new(Opcode::LoadIndexed).with_arg(InstructionArg::Name(name.clone())));
            }
            AssignTarget::Register(reg) => {
                out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(format!("{reg:?}"))));
            }
            AssignTarget::Memory { addr, .. } => {
                self.emit_expr(addr, out);
                out.push(Instruction::new(Opcode::LoadVar));
            }
        }
    }

    fn emit_if(
        &mut self,
        condition: &Expr,
        then_branch: &[Statement],
        else_branch: &[Statement],
        out: &mut ProgramBlock,
    ) {
        let else_label = self.next_label("else");
        let end_label = self.next_label("endif");
        self.emit_expr(condition, out);
        out.push(Instruction::new(Opcode::JumpIfFalse).with_label(else_label.clone()));
        for s in then_branch {
            self.emit_statement(s, out);
        }
        out.push(Instruction::new(Opcode::Jump).with_label(end_label.clone()));
        out.label(else_label);
        for s in else_branch {
            self.emit_statement(s, out);
        }
        out.label(end_label);
    }

    fn emit_while(&mut self, condition: &Expr, body: &[Statement], out: &mut ProgramBlock) {
        let top = self.next_label("while_top");
        let end = self.next_label("while_end");
        out.label(top.clone());
        self.emit_expr(condition, out);
        out.push(Instruction::new(Opcode::JumpIfFalse).with_label(end.clone()));
        for s in body {
            self.emit_statement(s, out);
        }
        out.push(Instruction::new(Opcode::Jump).with_label(top));
        out.label(end);
    }

    fn emit_repeat(&mut self, body: &[Statement], until: &Expr, out: &mut ProgramBlock) {
        let top = self.next_label("repeat_top");
        out.label(top.clone());
        for s in body {
            self.emit_statement(s, out);
        }
        self.emit_expr(until, out);
        out.push(Instruction::new(Opcode::JumpIfFalse).with_label(top));
    }

    fn emit_for(&mut self, loopvar: &ForTarget, iterable: &Expr, body: &[Statement], out: &mut ProgramBlock) {
        match iterable {
            Expr::Range { from, to, step, .. } => {
                self.emit_for_range(loopvar, from, to, step.as_deref(), body, out)
            }
            other => self.emit_for_iterable(loopvar, other, body, out),
        }
    }

    /// Emits a counted loop over a `RangeExpr`, honoring `step`'s direction
    /// and magnitude (spec §4.H) instead of assuming ascending-by-one. A
    /// non-literal step falls back to the ascending comparison, matching the
    /// direction the optimizer itself assumes when it can't resolve a step
    /// at fold time (see the range-materialization rule in optimize/expr.rs).
    fn emit_for_range(
        &mut self,
        loopvar: &ForTarget,
        from: &Expr,
        to: &Expr,
        step: Option<&Expr>,
        body: &[Statement],
        out: &mut ProgramBlock,
    ) {
        let top = self.next_label("for_top");
        let end = self.next_label("for_end");
        let var_name = for_target_name(loopvar);

        let literal_step = match step {
            Some(Expr::Literal(s)) => s.as_integer_value(),
            None => match (as_literal_int(from), as_literal_int(to)) {
                (Some(f), Some(t)) => Some(if t < f { -1 } else { 1 }),
                _ => None,
            },
            Some(_) => None,
        };
        let descending = literal_step.unwrap_or(1) < 0;

        self.emit_expr(from, out);
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(var_name.clone())));
        out.label(top.clone());

        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(var_name.clone())));
        self.emit_expr(to, out);
        out.push(Instruction::new(if descending { Opcode::CompareLt } else { Opcode::CompareGt }));
        out.push(Instruction::new(Opcode::JumpIfTrue).with_label(end.clone()));

        for s in body {
            self.emit_statement(s, out);
        }

        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(var_name.clone())));
        match step {
            Some(expr) => self.emit_expr(expr, out),
            None => {
                let default_step = if descending { -1 } else { 1 };
                out.push(Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Int(default_step)));
            }
        }
        out.push(Instruction::new(Opcode::Add));
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(var_name)));
        out.push(Instruction::new(Opcode::Jump).with_label(top));
        out.label(end);
    }

    /// Emits a counted loop over an array or string iterable (both mandated
    /// Iterable types), indexing element-by-element up to a runtime length
    /// rather than looping unconditionally. Length is fetched through a
    /// `Call "__len"` the runtime/assembler backend is expected to provide,
    /// the same synthetic-call convention `emit_statement` already uses for
    /// builtins and user subroutines.
    fn emit_for_iterable(&mut self, loopvar: &ForTarget, iterable: &Expr, body: &[Statement], out: &mut ProgramBlock) {
        let top = self.next_label("for_top");
        let end = self.next_label("for_end");
        let var_name = for_target_name(loopvar);
        let idx_name = self.next_label("for_idx");
        let len_name = self.next_label("for_len");

        let array_name = match iterable {
            Expr::Identifier { name, .. } => name.clone(),
            _ => {
                let tmp = self.next_label("for_src");
                self.emit_expr(iterable, out);
                out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(tmp.clone())));
                tmp
            }
        };

        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(array_name.clone())));
        out.push(Instruction::new(Opcode::Call).with_label("__len".to_string()));
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(len_name.clone())));
        out.push(Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Int(0)));
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(idx_name.clone())));

        out.label(top.clone());
        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(idx_name.clone())));
        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(len_name.clone())));
        out.push(Instruction::new(Opcode::CompareGe));
        out.push(Instruction::new(Opcode::JumpIfTrue).with_label(end.clone()));

        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(idx_name.clone())));
        out.push(Instruction::new(Opcode::LoadIndexed).with_arg(InstructionArg::Name(array_name)));
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(var_name)));

        for s in body {
            self.emit_statement(s, out);
        }

        out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(idx_name.clone())));
        out.push(Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Int(1)));
        out.push(Instruction::new(Opcode::Add));
        out.push(Instruction::new(Opcode::StoreVar).with_arg(InstructionArg::Name(idx_name)));
        out.push(Instruction::new(Opcode::Jump).with_label(top));
        out.label(end);
    }

    fn emit_expr(&mut self, expr: &Expr, out: &mut ProgramBlock) {
        match expr {
            Expr::Literal(v) => out.push(self.load_literal(v)),
            Expr::Identifier { name, .. } => {
                out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(name.clone())));
            }
            Expr::Prefix { op, inner, .. } => {
                self.emit_expr(inner, out);
                out.push(Instruction::new(match op {
                    PrefixOp::Plus => Opcode::Nop,
                    PrefixOp::Neg => Opcode::Neg,
                    PrefixOp::Invert => Opcode::Invert,
                    PrefixOp::Not => Opcode::Not,
                }));
            }
            Expr::Binary { left, op, right, .. } => {
                self.emit_expr(left, out);
                self.emit_expr(right, out);
                out.push(Instruction::new(binop_opcode(*op)));
            }
            Expr::FunctionCall { target, args, .. } => {
                for a in args {
                    self.emit_expr(a, out);
                }
                out.push(Instruction::new(Opcode::Call).with_label(target.clone()));
            }
            Expr::ArrayIndexed { name, index, .. } => {
                self.emit_expr(index, out);
                out.push(Instruction::new(Opcode::LoadIndexed).with_arg(InstructionArg::Name(name.clone())));
            }
            Expr::AddressOf { scopedname, name, .. } => {
                let resolved = scopedname.clone().unwrap_or_else(|| {
                    CompilerException::fail(format!(
                        "address-of '{name}' reached codegen without a resolved scoped name"
                    ))
                });
                out.push(Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Name(resolved)));
            }
            Expr::Typecast { value, dtype, .. } => {
                self.emit_expr(value, out);
                out.push(Instruction::new(Opcode::Cast).with_arg(InstructionArg::Name(dtype.to_string())));
            }
            Expr::Range { from, .. } => self.emit_expr(from, out),
            Expr::RegisterExpr { register, .. } => {
                out.push(Instruction::new(Opcode::LoadVar).with_arg(InstructionArg::Name(format!("{register:?}"))));
            }
            Expr::DirectMemoryRead { addr, .. } => {
                self.emit_expr(addr, out);
                out.push(Instruction::new(Opcode::LoadVar));
            }
        }
    }

    fn load_literal(&self, v: &crate::value::LiteralValue) -> Instruction {
        use crate::value::ValueBits;
        let arg = match &v.bits {
            ValueBits::Byte(b) => InstructionArg::Int(*b as i64),
            ValueBits::UByte(b) => InstructionArg::Int(*b as i64),
            ValueBits::Word(w) => InstructionArg::Int(*w as i64),
            ValueBits::UWord(w) => InstructionArg::Int(*w as i64),
            ValueBits::Float(f) => InstructionArg::Float(*f),
            ValueBits::Heap(id) => InstructionArg::Heap(*id),
        };
        Instruction::new(Opcode::LoadImmediate).with_arg(arg)
    }
}

fn for_target_name(loopvar: &ForTarget) -> String {
    match loopvar {
        ForTarget::Variable(name) => name.clone(),
        ForTarget::Register(reg) => format!("{reg:?}"),
    }
}

fn as_literal_int(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Literal(v) => v.as_integer_value(),
        _ => None,
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Pow => Opcode::Mul,
        BinOp::BitAnd | BinOp::And => Opcode::BitAnd,
        BinOp::BitOr | BinOp::Or => Opcode::BitOr,
        BinOp::BitXor | BinOp::Xor => Opcode::BitXor,
        BinOp::Shl => Opcode::Shl,
        BinOp::Shr => Opcode::Shr,
        BinOp::Lt => Opcode::CompareLt,
        BinOp::Gt => Opcode::CompareGt,
        BinOp::Le => Opcode::CompareLe,
        BinOp::Ge => Opcode::CompareGe,
        BinOp::Eq => Opcode::CompareEq,
        BinOp::Ne => Opcode::CompareNe,
    }
}

/// Idempotent peephole cleanup: collapses consecutive `Nop`s. Runs once per
/// block right after emission; safe to call again (a no-op on output that's
/// already clean), matching spec §4.H's "idempotent" requirement.
fn peephole_optimize(block: &mut ProgramBlock) {
    let mut result = Vec::with_capacity(block.instructions.len());
    let mut last_was_nop = false;
    for instr in block.instructions.drain(..) {
        let is_plain_nop = instr.opcode == Opcode::Nop && instr.arg == InstructionArg::None;
        if is_plain_nop && last_was_nop {
            continue;
        }
        last_was_nop = is_plain_nop;
        result.push(instr);
    }
    block.instructions = result;
}
