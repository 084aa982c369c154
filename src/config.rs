//! Compiler options (spec §5 directives / GLOSSARY).
//!
//! `CompilerOptions` models the handful of whole-module directives
//! (`%output`, `%launcher`, `%zeropage`, float support) as a builder-pattern
//! struct, the way the teacher compiler's `CompilerConfig` let a caller
//! extend the pipeline without touching its internals. This crate performs
//! no file I/O itself: a driver reads `%directive` statements out of the
//! parsed `Module` (or from its own project file) and passes the resolved
//! options in.

use crate::zeropage::ZeropageMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Prg,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Launcher {
    Basic,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub output: OutputFormat,
    pub launcher: Launcher,
    pub zeropage: ZeropageMode,
    pub enable_floats: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            output: OutputFormat::Prg,
            launcher: Launcher::Basic,
            zeropage: ZeropageMode::Compatible,
            enable_floats: false,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        CompilerOptions::default()
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_zeropage(mut self, mode: ZeropageMode) -> Self {
        self.zeropage = mode;
        self
    }

    pub fn with_floats(mut self, enabled: bool) -> Self {
        self.enable_floats = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_common_case() {
        let opts = CompilerOptions::default();
        assert_eq!(opts.output, OutputFormat::Prg);
        assert_eq!(opts.launcher, Launcher::Basic);
    }

    #[test]
    fn builder_overrides_compose() {
        let opts = CompilerOptions::new()
            .with_output(OutputFormat::Raw)
            .with_zeropage(ZeropageMode::DontUse)
            .with_floats(true);
        assert_eq!(opts.output, OutputFormat::Raw);
        assert_eq!(opts.zeropage, ZeropageMode::DontUse);
        assert!(opts.enable_floats);
    }
}
