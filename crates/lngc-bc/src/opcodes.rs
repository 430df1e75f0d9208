//! The instruction set.
//!
//! Opcodes are single bytes; operands follow inline as 32-bit signed
//! big-endian integers or 64-bit IEEE-754 big-endian floats. The numeric
//! values are frozen so `.vm` images stay portable.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A bytecode instruction opcode.
///
/// Decoding an unknown byte fails via `TryFromPrimitive`, which the VM
/// reports as the "unknown instruction" panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// Halt execution.
    Hlt = 0,
    /// Load int immediate.
    Ldi = 1,
    /// Load float immediate.
    Ldf = 2,
    /// Load string from the data pool.
    Lds = 3,
    /// Store top of stack into a variable.
    Sto = 4,
    /// Load a variable.
    Ldv = 5,
    /// Unconditional jump.
    Jmp = 6,
    /// Jump if truthy.
    Jpt = 7,
    /// Jump if falsy.
    Jpf = 8,
    /// Call a function address.
    Cal = 9,
    /// Return from a function.
    Ret = 10,
    /// Load nil.
    Ldn = 11,
    /// No operation.
    Nop = 12,
    /// Write top of stack to stdout.
    Wrt = 13,
    /// Addition.
    Add = 14,
    /// Subtraction.
    Sub = 15,
    /// Multiplication.
    Mul = 16,
    /// Division.
    Div = 17,
    /// Equal.
    Eq = 18,
    /// Not equal.
    Ne = 19,
    /// Less than.
    Lt = 20,
    /// Less or equal.
    Le = 21,
    /// Greater than.
    Gt = 22,
    /// Greater or equal.
    Ge = 23,
    /// Logical and (eager).
    And = 24,
    /// Logical or (eager).
    Or = 25,
    /// Logical not.
    Not = 26,
    /// Arithmetic negation.
    Neg = 27,
    /// Duplicate top of stack.
    Dup = 28,
    /// Increment top of stack.
    Inc = 29,
    /// Decrement top of stack.
    Dec = 30,
    /// Declare a variable (allocate a memory slot).
    Let = 31,
    /// Bitwise not.
    Bnt = 32,
    /// Shift left.
    Shl = 33,
    /// Shift right.
    Shr = 34,
    /// Bitwise xor.
    Xor = 35,
    /// Bitwise or.
    Bor = 36,
    /// Bitwise and.
    Bnd = 37,
    /// Exit the process with the popped code.
    Ext = 38,
    /// Discard top of stack.
    Pop = 39,
    /// Build a list from the popped values.
    Ldl = 40,
    /// List subscript.
    Get = 41,
    /// List append.
    Apd = 42,
    /// List pop at index.
    Lpp = 43,
    /// Length of a list or string.
    Len = 44,
    /// Shallow copy.
    Cpy = 45,
    /// Type name of a value.
    Typ = 46,
    /// List element assignment.
    Set = 47,
    /// File open.
    Fop = 48,
    /// File write.
    Fwt = 49,
    /// File read (whole remainder).
    Frd = 50,
    /// File close.
    Fcl = 51,
    /// File read line.
    Frl = 52,
    /// Source position annotation (debug only, no stack effect).
    Pos = 53,
}

/// The inline operand types an opcode consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// 32-bit signed big-endian integer.
    I32,
    /// 64-bit IEEE-754 big-endian float.
    F64,
    /// 32-bit data-pool index.
    Data,
    /// 32-bit code address.
    Addr,
}

impl OpCode {
    /// Lowercase mnemonic as printed by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Hlt => "hlt",
            OpCode::Ldi => "ldi",
            OpCode::Ldf => "ldf",
            OpCode::Lds => "lds",
            OpCode::Sto => "sto",
            OpCode::Ldv => "ldv",
            OpCode::Jmp => "jmp",
            OpCode::Jpt => "jpt",
            OpCode::Jpf => "jpf",
            OpCode::Cal => "cal",
            OpCode::Ret => "ret",
            OpCode::Ldn => "ldn",
            OpCode::Nop => "nop",
            OpCode::Wrt => "wrt",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Eq => "eq",
            OpCode::Ne => "ne",
            OpCode::Lt => "lt",
            OpCode::Le => "le",
            OpCode::Gt => "gt",
            OpCode::Ge => "ge",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Not => "not",
            OpCode::Neg => "neg",
            OpCode::Dup => "dup",
            OpCode::Inc => "inc",
            OpCode::Dec => "dec",
            OpCode::Let => "let",
            OpCode::Bnt => "bnt",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::Xor => "xor",
            OpCode::Bor => "bor",
            OpCode::Bnd => "bnd",
            OpCode::Ext => "ext",
            OpCode::Pop => "pop",
            OpCode::Ldl => "ldl",
            OpCode::Get => "get",
            OpCode::Apd => "apd",
            OpCode::Lpp => "lpp",
            OpCode::Len => "len",
            OpCode::Cpy => "cpy",
            OpCode::Typ => "typ",
            OpCode::Set => "set",
            OpCode::Fop => "fop",
            OpCode::Fwt => "fwt",
            OpCode::Frd => "frd",
            OpCode::Fcl => "fcl",
            OpCode::Frl => "frl",
            OpCode::Pos => "pos",
        }
    }

    /// The inline operands this opcode consumes, in order.
    pub fn operands(self) -> &'static [OperandKind] {
        match self {
            OpCode::Ldi | OpCode::Ldl => &[OperandKind::I32],
            OpCode::Ldf => &[OperandKind::F64],
            OpCode::Lds | OpCode::Sto | OpCode::Ldv | OpCode::Let => &[OperandKind::Data],
            OpCode::Jmp | OpCode::Jpt | OpCode::Jpf | OpCode::Cal => &[OperandKind::Addr],
            // file, line, callee name (or -1)
            OpCode::Pos => &[OperandKind::Data, OperandKind::I32, OperandKind::I32],
            _ => &[],
        }
    }
}
