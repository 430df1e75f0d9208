//! Runtime values.
//!
//! Values are dynamically typed and carry their tag at runtime. Lists
//! are reference values: clones on the stack share the underlying
//! sequence, so mutations through one are observed by all. `copy()` is
//! the only way to get an independent (shallow) duplicate.

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::rc::Rc;

/// A dynamically typed VM value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Immutable string.
    Str(Rc<String>),
    /// Mutable shared list.
    List(Rc<RefCell<Vec<Value>>>),
    /// Open (or closed) file handle.
    File(Rc<FileHandle>),
    /// The nil value.
    Nil,
}

impl Value {
    /// Build a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(Rc::new(value.into()))
    }

    /// Build a list value.
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    /// The name `type()` reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::File(_) => "file",
            Value::Nil => "nil",
        }
    }

    /// Truthiness: nil, zero, the empty string, and the empty list are
    /// falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::List(values) => !values.borrow().is_empty(),
            Value::File(_) => true,
        }
    }

    /// Equality as `==` sees it: numbers compare across int/float,
    /// lists compare element-wise, files by identity, and values of
    /// different types are simply unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            },
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            },
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }

    /// The form used inside list displays: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(value) => format!("\"{}\"", value),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => {
                let text = value.to_string();
                if text.contains('.') || text.contains('e') || text.contains("inf")
                    || text.contains("NaN")
                {
                    write!(f, "{}", text)
                } else {
                    write!(f, "{}.0", text)
                }
            },
            Value::Str(value) => write!(f, "{}", value),
            Value::List(values) => {
                let rendered: Vec<String> =
                    values.borrow().iter().map(|v| v.repr()).collect();
                write!(f, "[{}]", rendered.join(", "))
            },
            Value::File(handle) => write!(f, "<file {}>", handle.path()),
            Value::Nil => write!(f, "nil"),
        }
    }
}

/// A file handle created by `fopen`.
///
/// Handles are reference values like lists: `fclose` through one stack
/// copy closes them all. Leaked handles stay open until process exit.
#[derive(Debug)]
pub struct FileHandle {
    path: String,
    state: RefCell<FileState>,
}

/// What the handle can currently do.
#[derive(Debug)]
pub enum FileState {
    /// Opened with mode "r".
    Read(BufReader<File>),
    /// Opened with mode "w" or "a".
    Write(File),
    /// Closed by `fclose`.
    Closed,
}

impl FileHandle {
    /// Wrap an opened file.
    pub fn new(path: String, state: FileState) -> Self {
        Self {
            path,
            state: RefCell::new(state),
        }
    }

    /// The path the handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The handle's state cell.
    pub fn state(&self) -> &RefCell<FileState> {
        &self.state
    }
}
