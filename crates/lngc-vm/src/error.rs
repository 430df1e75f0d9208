//! Runtime panics.
//!
//! A panic terminates the VM with exit code 1 after the runner prints
//! the message and a call-stack trace. None of these unwind the Rust
//! stack; the execute loop returns them as `Err`.

use thiserror::Error;

/// Fatal runtime errors.
#[derive(Debug, Error)]
pub enum VmPanic {
    /// No free slot left in the variable store.
    #[error("memory overflow")]
    MemoryOverflow,

    /// Division with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// Shift by a negative count.
    #[error("negative shift count")]
    NegativeShift,

    /// Binary operator applied to operand types it does not support.
    #[error("illegal operation between {left} and {right}")]
    IllegalOperation {
        /// Type name of the left operand.
        left: &'static str,
        /// Type name of the right operand.
        right: &'static str,
    },

    /// Unary operator applied to an operand type it does not support.
    #[error("illegal operation on {0}")]
    IllegalUnaryOperation(&'static str),

    /// Subscript of a value that is not a list.
    #[error("value not subscriptable")]
    NotSubscriptable,

    /// A non-integer subscript or element index.
    #[error("invalid index")]
    InvalidIndex,

    /// An element index outside the list.
    #[error("list index out of range")]
    IndexOutOfRange,

    /// A value without a length passed to `length`.
    #[error("value has no length")]
    NoLength,

    /// An opcode byte outside the instruction table.
    #[error("unknown instruction {0}")]
    UnknownInstruction(u8),

    /// A jump or call target outside the code section.
    #[error("invalid address {0}")]
    InvalidAddress(i32),

    /// The program counter ran past the end of the code section.
    #[error("unexpected end of code")]
    UnexpectedEnd,

    /// A value-stack pop with nothing to pop.
    #[error("stack underflow")]
    StackUnderflow,

    /// A `RET` with no frame to return to.
    #[error("call stack underflow")]
    CallStackUnderflow,

    /// A data-pool reference outside the data section.
    #[error("invalid data index {0}")]
    InvalidDataIndex(i32),

    /// Load or store of a name with no bound slot.
    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    /// `fopen` with a mode other than "r", "w", or "a".
    #[error("invalid file mode \"{0}\"")]
    InvalidFileMode(String),

    /// Write on a handle not opened for writing.
    #[error("file is not open for writing")]
    NotWritable,

    /// Read on a handle not opened for reading.
    #[error("file is not open for reading")]
    NotReadable,

    /// An operating-system error during I/O.
    #[error("{0}")]
    Io(String),
}
