//! Built-in function table.
//!
//! Built-ins compile to a single opcode instead of a `CAL`. The semantic
//! analyzer checks their arity inline; the code generator consults
//! `returns_value` to know whether a bare call statement needs a
//! trailing `POP`.

use crate::opcodes::OpCode;

/// One entry of the built-in function table.
#[derive(Clone, Copy, Debug)]
pub struct BuiltIn {
    /// Source-level name.
    pub name: &'static str,
    /// Number of arguments.
    pub arity: usize,
    /// The instruction the call compiles to.
    pub opcode: OpCode,
    /// Whether the instruction pushes a result.
    pub returns_value: bool,
}

/// All built-in functions, in table order.
pub const BUILT_INS: &[BuiltIn] = &[
    BuiltIn {
        name: "write",
        arity: 1,
        opcode: OpCode::Wrt,
        returns_value: false,
    },
    BuiltIn {
        name: "exit",
        arity: 1,
        opcode: OpCode::Ext,
        returns_value: false,
    },
    BuiltIn {
        name: "append",
        arity: 2,
        opcode: OpCode::Apd,
        returns_value: false,
    },
    BuiltIn {
        name: "pop",
        arity: 2,
        opcode: OpCode::Lpp,
        returns_value: false,
    },
    BuiltIn {
        name: "length",
        arity: 1,
        opcode: OpCode::Len,
        returns_value: true,
    },
    BuiltIn {
        name: "copy",
        arity: 1,
        opcode: OpCode::Cpy,
        returns_value: true,
    },
    BuiltIn {
        name: "type",
        arity: 1,
        opcode: OpCode::Typ,
        returns_value: true,
    },
    BuiltIn {
        name: "set",
        arity: 3,
        opcode: OpCode::Set,
        returns_value: false,
    },
    BuiltIn {
        name: "fopen",
        arity: 2,
        opcode: OpCode::Fop,
        returns_value: true,
    },
    BuiltIn {
        name: "fwrite",
        arity: 2,
        opcode: OpCode::Fwt,
        returns_value: false,
    },
    BuiltIn {
        name: "fread",
        arity: 1,
        opcode: OpCode::Frd,
        returns_value: true,
    },
    BuiltIn {
        name: "fclose",
        arity: 1,
        opcode: OpCode::Fcl,
        returns_value: false,
    },
    BuiltIn {
        name: "freadline",
        arity: 1,
        opcode: OpCode::Frl,
        returns_value: true,
    },
];

/// Look up a built-in by its source name.
pub fn built_in(name: &str) -> Option<&'static BuiltIn> {
    BUILT_INS.iter().find(|b| b.name == name)
}
