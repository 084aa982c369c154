//! Source position tracking.
//!
//! Every AST node and every literal value carries a `Position` so that
//! diagnostics and line-marker IR instructions can point back at source text.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Position {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder position for synthesized nodes that have no direct
    /// source counterpart (e.g. a default initializer the checker injects).
    pub fn synthetic() -> Self {
        Position {
            file: String::new(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let pos = Position::new("main.dfg", 10, 3);
        assert_eq!(pos.to_string(), "main.dfg:10:3");
    }

    #[test]
    fn synthetic_is_stable() {
        assert_eq!(Position::synthetic(), Position::synthetic());
    }
}
