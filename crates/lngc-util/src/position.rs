//! Source location tracking.
//!
//! A [`Position`] is the (file name, line, column) triple attached to every
//! token and AST node. Diagnostics render it as `<file>:<line>:<col>`.

use std::fmt;
use std::sync::Arc;

/// A location in a source file.
///
/// The file name is shared via `Arc` so that positions can be cloned
/// freely onto every token and node without duplicating the string.
///
/// # Examples
///
/// ```
/// use lngc_util::Position;
///
/// let pos = Position::new("main.lng".into(), 3, 7);
/// assert_eq!(pos.to_string(), "main.lng:3:7");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Name of the source file.
    pub file: Arc<str>,
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based).
    pub column: u32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub fn new(file: Arc<str>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A placeholder position for tests and synthesized nodes.
    pub fn dummy() -> Self {
        Self {
            file: Arc::from("<dummy>"),
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
