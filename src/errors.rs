//! Error kinds, per spec §7.
//!
//! `CompileError` covers the recoverable kinds (`Syntax`, `Expression`,
//! `Name`) that the checker accumulates and the folder raises. The fatal
//! kinds (`AstException`, `CompilerException`) are modeled separately as
//! `panic!`-driven invariant failures rather than `Result` variants, per
//! §7's "no recovery" propagation policy — a caller cannot usefully handle
//! them, only a human reading the panic message can.

use crate::position::Position;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("{position}: {message}")]
    Syntax { message: String, position: Position },

    #[error("{position}: {message}")]
    Expression { message: String, position: Position },

    #[error("{position}: {message}")]
    Name { message: String, position: Position },
}

impl CompileError {
    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        CompileError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn expression(message: impl Into<String>, position: Position) -> Self {
        CompileError::Expression {
            message: message.into(),
            position,
        }
    }

    pub fn name(message: impl Into<String>, position: Position) -> Self {
        CompileError::Name {
            message: message.into(),
            position,
        }
    }

    pub fn position(&self) -> &Position {
        match self {
            CompileError::Syntax { position, .. }
            | CompileError::Expression { position, .. }
            | CompileError::Name { position, .. } => position,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Syntax { message, .. }
            | CompileError::Expression { message, .. }
            | CompileError::Name { message, .. } => message,
        }
    }
}

/// Raised when the AST violates an invariant the checker/optimizer should
/// already have guaranteed (e.g. a string literal missing its heap id). This
/// indicates an internal compiler bug, not a user error, so it aborts
/// compilation immediately rather than joining the accumulated error list.
#[derive(Debug, Error)]
#[error("internal error (AST invariant violated) at {position}: {message}")]
pub struct AstException {
    pub message: String,
    pub position: Position,
}

impl AstException {
    pub fn fail(message: impl Into<String>, position: Position) -> ! {
        panic!("{}", AstException {
            message: message.into(),
            position,
        });
    }
}

/// Raised by the IR emitter when it observes an inconsistency that means
/// the checker or optimizer failed to enforce an invariant upstream.
#[derive(Debug, Error)]
#[error("internal compiler error during IR emission: {0}")]
pub struct CompilerException(pub String);

impl CompilerException {
    pub fn fail(message: impl Into<String>) -> ! {
        panic!("{}", CompilerException(message.into()));
    }
}

/// Zero-page allocator exhaustion; always downgraded to a warning by the
/// caller (spec §7: "converted to a warning").
#[derive(Debug, Clone, Error, PartialEq)]
#[error("zero page depleted while allocating '{variable}'")]
pub struct ZeropageDepletedError {
    pub variable: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let e = CompileError::name("undefined identifier 'x'", Position::new("a.dfg", 3, 1));
        assert_eq!(e.to_string(), "a.dfg:3:1: undefined identifier 'x'");
    }
}
