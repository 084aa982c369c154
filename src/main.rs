//! Dragonforge core CLI (`dfc`).
//!
//! Since the lexer/parser is out of scope for this crate (spec §1
//! Non-goals), the CLI accepts a `serde_json`-serialized `ast::Module`
//! fixture standing in for what an external front end would hand this
//! pipeline, runs it through `dragonforgec::compile`, and either prints the
//! rendered diagnostics or (on success) the debug textual form of the IR.

use clap::Parser as ClapParser;
use dragonforgec::config::CompilerOptions;
use dragonforgec::heap::Heap;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "dfc")]
#[command(about = "Dragonforge semantic checker, optimizer and IR emitter", long_about = None)]
struct Cli {
    /// Path to a JSON-serialized ast::Module fixture
    input: PathBuf,

    /// Print the emitted IR in its debug textual form
    #[arg(long)]
    dump_ir: bool,

    /// Module name used in the diagnostics summary line
    #[arg(long, default_value = "main")]
    module_name: String,
}

fn main() {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let mut module: dragonforgec::ast::Module = match serde_json::from_str(&source) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {} is not a valid module fixture: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let mut heap = Heap::new();
    let options = CompilerOptions::default();
    let output = dragonforgec::compile(&mut module, &mut heap, &options);

    let rendered = output.diagnostics.render(&cli.module_name);
    if !rendered.is_empty() {
        print!("{rendered}");
    }

    match output.program {
        Some(program) => {
            if cli.dump_ir {
                println!("{program}");
            }
        }
        None => process::exit(1),
    }
}
