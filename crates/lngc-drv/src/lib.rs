//! lngc-drv - Compilation pipeline orchestration.
//!
//! Runs the phases in order over one source file:
//!
//! ```text
//! source text ──lex──▶ tokens ──parse──▶ AST ──analyze──▶ AST ──generate──▶ image
//! ```
//!
//! Data flows strictly forward as plain values; no phase holds on to
//! another's state. The first error from any phase stops the pipeline
//! and is returned as a [`Diagnostic`] ready for printing; warnings go
//! through the [`Handler`] and do not stop compilation.

use std::fs;
use std::path::Path;

use lngc_bc::ProgramImage;
use lngc_gen::CodeGenerator;
use lngc_lex::Lexer;
use lngc_par::Parser;
use lngc_sem::SemanticAnalyzer;
use lngc_util::{Diagnostic, Handler};

/// Compile source text into a program image.
///
/// `file_name` is used for diagnostics and for the position annotations
/// embedded in the image.
pub fn compile_source(
    file_name: &str,
    source: &str,
    handler: &Handler,
) -> Result<ProgramImage, Diagnostic> {
    let tokens = Lexer::new(file_name, source)
        .lex()
        .map_err(|e| Diagnostic::error(e.to_string(), Some(e.position().clone())))?;

    let ast = Parser::new(tokens)
        .parse()
        .map_err(|e| Diagnostic::error(e.to_string(), Some(e.position().clone())))?;

    SemanticAnalyzer::new(handler)
        .analyze(&ast)
        .map_err(|e| Diagnostic::error(e.to_string(), e.position().cloned()))?;

    CodeGenerator::new(file_name)
        .generate(&ast)
        .map_err(|e| Diagnostic::error(e.to_string(), None))
}

/// Read and compile a source file.
pub fn compile_file(path: &Path, handler: &Handler) -> Result<ProgramImage, Diagnostic> {
    let source = fs::read_to_string(path)
        .map_err(|_| Diagnostic::error(format!("no such file {}", path.display()), None))?;

    compile_source(&path.display().to_string(), &source, handler)
}
