//! Diagnostic reporting infrastructure.
//!
//! The reporter formats messages as `<file>:<line>:<col>: <level>: <msg>`.
//! Errors are fatal: the phase that produces one stops and the driver
//! exits with code 1. Warnings are printed to stderr as they occur and
//! compilation continues.
//!
//! # Examples
//!
//! ```
//! use lngc_util::{Diagnostic, Handler, Position};
//!
//! let handler = Handler::new();
//! handler.emit(Diagnostic::warning(
//!     "variable x was used but not initialized",
//!     Some(Position::new("main.lng".into(), 2, 5)),
//! ));
//! assert_eq!(handler.warning_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::position::Position;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A fatal error; compilation stops at the first one.
    Error,
    /// A non-fatal warning; compilation continues.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity and optional location.
///
/// Some diagnostics have no position ("no entry point" is raised after
/// the whole program has been walked), so the position is optional.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Human-readable message.
    pub message: String,
    /// Source location, when one exists.
    pub position: Option<Position>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            position,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(f, "{}: {}: {}", pos, self.level, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

/// Collects diagnostics for a single compilation.
///
/// Warnings are printed to stderr as soon as they are emitted; everything
/// is also recorded so tests and the driver can query counts afterwards.
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    /// Suppresses printing; used by unit tests.
    quiet: bool,
}

impl Handler {
    /// Create a new handler that prints warnings to stderr.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            quiet: false,
        }
    }

    /// Create a handler that records diagnostics without printing.
    pub fn quiet() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            quiet: true,
        }
    }

    /// Record a diagnostic, printing it to stderr unless quiet.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if !self.quiet {
            eprintln!("{}", diagnostic);
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Whether any error-level diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of warnings recorded so far.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// A snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}
