//! Intermediate representation data model (spec §4.H).
//!
//! This is the closed target the emitter lowers checked/optimized ASTs
//! into. The `Display` impl at the bottom renders IR as text purely for
//! tests and debugging (`dfc --dump-ir`); it is explicitly NOT the
//! canonical format a downstream assembler would consume (spec §1
//! Non-goals: textual IR serialization is out of scope as a stable
//! contract), so it makes no effort at round-trip parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Nop,
    LoadImmediate,
    LoadVar,
    StoreVar,
    LoadIndexed,
    StoreIndexed,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Neg,
    Invert,
    Not,
    Cast,
    CompareEq,
    CompareNe,
    CompareLt,
    CompareGt,
    CompareLe,
    CompareGe,
    Jump,
    JumpIfFalse,
    JumpIfTrue,
    Call,
    Return,
    Push,
    Pop,
    LineMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionArg {
    None,
    Int(i64),
    Float(f64),
    Name(String),
    Heap(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: InstructionArg,
    pub arg2: InstructionArg,
    pub call_label: Option<String>,
    pub call_label2: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            arg: InstructionArg::None,
            arg2: InstructionArg::None,
            call_label: None,
            call_label2: None,
        }
    }

    pub fn with_arg(mut self, arg: InstructionArg) -> Self {
        self.arg = arg;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.call_label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelInstr {
    pub name: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramBlock {
    pub name: String,
    pub address: Option<u32>,
    pub instructions: Vec<Instruction>,
    pub variables: Vec<String>,
    pub memory_pointers: Vec<(String, u32)>,
    pub labels: Vec<LabelInstr>,
    pub force_output: bool,
}

impl ProgramBlock {
    pub fn new(name: impl Into<String>) -> Self {
        ProgramBlock {
            name: name.into(),
            address: None,
            instructions: Vec::new(),
            variables: Vec::new(),
            memory_pointers: Vec::new(),
            labels: Vec::new(),
            force_output: false,
        }
    }

    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub fn label(&mut self, name: impl Into<String>) {
        let position = self.instructions.len();
        self.labels.push(LabelInstr {
            name: name.into(),
            position,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub blocks: Vec<ProgramBlock>,
}

impl fmt::Display for InstructionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionArg::None => Ok(()),
            InstructionArg::Int(v) => write!(f, "{v}"),
            InstructionArg::Float(v) => write!(f, "{v}"),
            InstructionArg::Name(n) => write!(f, "{n}"),
            InstructionArg::Heap(id) => write!(f, "@{id}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    {:?}", self.opcode)?;
        if self.arg != InstructionArg::None {
            write!(f, " {}", self.arg)?;
        }
        if self.arg2 != InstructionArg::None {
            write!(f, ", {}", self.arg2)?;
        }
        if let Some(label) = &self.call_label {
            write!(f, " {label}")?;
        }
        if let Some(label) = &self.call_label2 {
            write!(f, ", {label}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProgramBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(addr) => writeln!(f, "{} ${:04x} {{", self.name, addr)?,
            None => writeln!(f, "{} {{", self.name)?,
        }
        let mut label_iter = self.labels.iter().peekable();
        for (idx, instr) in self.instructions.iter().enumerate() {
            while let Some(l) = label_iter.peek() {
                if l.position == idx {
                    writeln!(f, "{}:", l.name)?;
                    label_iter.next();
                } else {
                    break;
                }
            }
            writeln!(f, "{instr}")?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_instruction_with_arg() {
        let instr = Instruction::new(Opcode::LoadImmediate).with_arg(InstructionArg::Int(5));
        assert_eq!(instr.to_string(), "    LoadImmediate 5");
    }

    #[test]
    fn renders_block_with_label() {
        let mut block = ProgramBlock::new("main");
        block.push(Instruction::new(Opcode::Nop));
        block.label("loop_top");
        block.push(Instruction::new(Opcode::Jump).with_label("loop_top"));
        let text = block.to_string();
        assert!(text.contains("loop_top:"));
        assert!(text.contains("Jump loop_top"));
    }
}
