//! Error/warning accumulation and rendering, per spec §6/§7.
//!
//! The checker never stops at the first error: it accumulates recoverable
//! errors and reports them in one batch, suppressing duplicates by string
//! equality. Warnings do not halt compilation.

use crate::errors::CompileError;
use colored::Colorize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub position: crate::position::Position,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn error(&mut self, err: CompileError) {
        let text = err.to_string();
        if !self.errors.iter().any(|e| e.to_string() == text) {
            self.errors.push(err);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>, position: crate::position::Position) {
        let warning = Warning {
            message: message.into(),
            position,
        };
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Render all accumulated diagnostics the way spec §6 describes: one
    /// line per error/warning, errors prefixed with position, warnings
    /// highlighted, and a trailing summary line when there are errors.
    pub fn render(&self, module_name: &str) -> String {
        let mut out = String::new();
        for w in &self.warnings {
            let _ = writeln!(
                out,
                "{}",
                format!("{}: warning: {}", w.position, w.message).yellow()
            );
        }
        for e in &self.errors {
            let _ = writeln!(out, "{}", e);
        }
        if !self.errors.is_empty() {
            let _ = writeln!(
                out,
                "There are {} errors in module '{}'.",
                self.errors.len(),
                module_name
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn duplicate_errors_are_suppressed() {
        let mut diags = Diagnostics::new();
        let pos = Position::new("a.dfg", 1, 1);
        diags.error(CompileError::name("dup", pos.clone()));
        diags.error(CompileError::name("dup", pos));
        assert_eq!(diags.errors().len(), 1);
    }

    #[test]
    fn render_includes_summary_line() {
        let mut diags = Diagnostics::new();
        diags.error(CompileError::syntax("bad thing", Position::new("a.dfg", 1, 1)));
        let out = diags.render("main");
        assert!(out.contains("There are 1 errors in module 'main'."));
    }

    #[test]
    fn render_with_no_errors_has_no_summary() {
        let diags = Diagnostics::new();
        assert!(!diags.render("main").contains("errors in module"));
    }
}
