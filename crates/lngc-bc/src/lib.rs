//! lngc-bc - Bytecode definitions shared by the compiler and the VM.
//!
//! This crate owns the three things both sides of the toolchain must
//! agree on:
//!
//! - the one-byte opcode enumeration ([`OpCode`]), whose numeric values
//!   are part of the `.vm` file format and must never change;
//! - the built-in function table ([`BUILT_INS`]);
//! - the program-image container ([`ProgramImage`]): signature, data
//!   section, code section.

pub mod builtins;
pub mod image;
pub mod opcodes;

pub use builtins::{built_in, BuiltIn, BUILT_INS};
pub use image::{ImageError, ProgramImage, SIGNATURE};
pub use opcodes::{OpCode, OperandKind};
