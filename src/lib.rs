//! Dragonforge semantic analysis, optimization and IR emission core.
//!
//! Pipeline: optimize expressions/statements to a fixed point, then check
//! the result, then emit IR (which itself runs a zero-page allocation pass
//! and a final peephole cleanup). Parsing and textual/binary output of the
//! produced `ir::Program` are both out of scope (spec §1 Non-goals) — a
//! driver is expected to hand this crate an already-parsed `ast::Module`
//! and take its `ir::Program` onward to an assembler of its own.

pub mod ast;
pub mod builtins;
pub mod check;
pub mod codegen;
pub mod config;
pub mod datatype;
pub mod diagnostics;
pub mod errors;
pub mod eval;
pub mod heap;
pub mod ir;
pub mod namespace;
pub mod optimize;
pub mod position;
pub mod value;
pub mod visit;
pub mod zeropage;

use ast::Module;
use config::CompilerOptions;
use diagnostics::Diagnostics;
use errors::CompileError;
use heap::Heap;
use ir::Program;

/// Result of a full compile: the emitted IR (present even when there are
/// errors the caller chose to `render` first; also `None` if errors made IR
/// emission dangerous to attempt) plus accumulated diagnostics.
pub struct CompileOutput {
    pub program: Option<Program>,
    pub diagnostics: Diagnostics,
}

/// Runs the full pipeline over an already-parsed module: optimize to a
/// fixed point, check, and (if no errors) emit IR. `heap` is threaded
/// through because the optimizer's string-constant-folding and the
/// checker's default-initializer injection both allocate into it.
pub fn compile(module: &mut Module, heap: &mut Heap, options: &CompilerOptions) -> CompileOutput {
    let mut fold_errors: Vec<CompileError> = Vec::new();
    optimize::optimize_to_fixed_point(module, heap, &mut fold_errors);

    let mut diagnostics = check::check_module(module, heap);
    for e in fold_errors {
        diagnostics.error(e);
    }

    if diagnostics.has_errors() {
        return CompileOutput {
            program: None,
            diagnostics,
        };
    }

    let mut codegen = codegen::CodeGen::new(options.zeropage);
    let program = codegen.emit(module, &mut diagnostics);

    CompileOutput {
        program: Some(program),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Statement, VarDecl, VarDeclKind};
    use crate::datatype::DataType;
    use crate::position::Position;
    use crate::value::LiteralValue;

    fn pos() -> Position {
        Position::synthetic()
    }

    #[test]
    fn compiles_a_minimal_module_to_ir() {
        let mut module = Module {
            statements: vec![Statement::Block(Block {
                id: 1,
                name: "main".into(),
                address: None,
                statements: vec![Statement::VarDecl(VarDecl {
                    kind: VarDeclKind::Var,
                    dtype: DataType::UByte,
                    name: "x".into(),
                    value: Some(literal(1)),
                    arraysize: None,
                    zeropage: false,
                    position: pos(),
                })],
                force_output: false,
                position: pos(),
            })],
        };
        let mut heap = Heap::new();
        let options = CompilerOptions::default();
        let output = compile(&mut module, &mut heap, &options);
        assert!(!output.diagnostics.has_errors());
        assert!(output.program.is_some());
    }

    #[test]
    fn stops_before_ir_emission_when_checker_finds_errors() {
        let mut module = Module { statements: vec![] };
        let mut heap = Heap::new();
        let options = CompilerOptions::default();
        let output = compile(&mut module, &mut heap, &options);
        assert!(output.diagnostics.has_errors());
        assert!(output.program.is_none());
    }

    fn literal(n: u8) -> crate::ast::Expr {
        crate::ast::Expr::Literal(LiteralValue::ubyte(n, pos()))
    }
}
