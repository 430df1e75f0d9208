//! lngc-util - Shared infrastructure for the lng compiler and VM.
//!
//! This crate provides the types every phase of the toolchain depends on:
//!
//! - [`Position`]: a (file, line, column) source location attached to every
//!   token and AST node for diagnostics.
//! - [`Diagnostic`], [`Level`], [`Handler`]: the diagnostic reporter.
//!   Compile errors are fatal on first occurrence and travel up the
//!   pipeline as `Err` values; warnings are emitted through the handler
//!   and compilation continues.

pub mod diagnostic;
pub mod position;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use position::Position;
